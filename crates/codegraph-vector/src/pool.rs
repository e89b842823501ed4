//! Bounded-concurrency embedding pool (component C4, spec §4.3). N
//! independent inference contexts share one loaded model; requests acquire a
//! context from a free-list or queue FIFO when none is free, and a released
//! context either hands off directly to the head of the queue or returns to
//! the free-list — the same scheduling shape as the teacher's session-pool
//! note in `onnx_provider.rs`, generalized over [`InferenceBackend`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use codegraph_core::CodeGraphError;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::backend::{InferenceBackend, InferenceContext};

pub const DEFAULT_POOL_SIZE: usize = 4;

struct PoolInner<C> {
    free: Mutex<VecDeque<C>>,
    waiters: Mutex<VecDeque<oneshot::Sender<C>>>,
}

/// A borrowed context. Always releases back to the pool on drop — including
/// when the holding future is cancelled mid-`.await` — so contexts are never
/// leaked on any exit path (spec §5 "Cancellation").
struct ContextGuard<C: InferenceContext> {
    ctx: Option<C>,
    inner: Arc<PoolInner<C>>,
}

impl<C: InferenceContext> ContextGuard<C> {
    fn context(&self) -> &C {
        self.ctx.as_ref().expect("context taken only by Drop")
    }
}

impl<C: InferenceContext> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        let Some(ctx) = self.ctx.take() else {
            return;
        };
        let mut waiters = self.inner.waiters.lock();
        match waiters.pop_front() {
            Some(tx) => {
                // Direct handoff: the context stays logically busy, no free-list flap.
                if let Err(ctx) = tx.send(ctx) {
                    self.inner.free.lock().push_back(ctx);
                }
            }
            None => {
                drop(waiters);
                self.inner.free.lock().push_back(ctx);
            }
        }
    }
}

/// `embed_query`/`embed_document` with a lazy `initialize()`/`dispose()` and
/// a `ready` observable (spec §4.3).
pub struct EmbeddingPool<B: InferenceBackend> {
    backend: B,
    pool_size: usize,
    inner: Arc<PoolInner<B::Context>>,
    ready: Arc<AtomicBool>,
}

impl<B: InferenceBackend> EmbeddingPool<B> {
    pub fn new(backend: B, pool_size: usize) -> Self {
        Self {
            backend,
            pool_size: pool_size.max(1),
            inner: Arc::new(PoolInner {
                free: Mutex::new(VecDeque::new()),
                waiters: Mutex::new(VecDeque::new()),
            }),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Creates `pool_size` contexts, thread affinity `max(1, cpu_count /
    /// pool_size)` each. If any context fails to initialize, every context
    /// created so far is disposed before the error propagates (spec §4.3
    /// "partial initialization failure").
    pub fn initialize(&self) -> Result<(), CodeGraphError> {
        if self.is_ready() {
            return Ok(());
        }
        let threads = (num_cpus::get() / self.pool_size).max(1);
        info!(pool_size = self.pool_size, threads, "initializing embedding pool");

        let mut created = Vec::with_capacity(self.pool_size);
        for i in 0..self.pool_size {
            match self.backend.create_context(threads) {
                Ok(ctx) => created.push(ctx),
                Err(err) => {
                    warn!(context_index = i, error = %err, "embedding context init failed, disposing partial pool");
                    drop(created);
                    return Err(err);
                }
            }
        }
        self.inner.free.lock().extend(created);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn dispose(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.inner.free.lock().clear();
        debug!("embedding pool disposed");
    }

    async fn acquire(&self) -> ContextGuard<B::Context> {
        if let Some(ctx) = self.inner.free.lock().pop_front() {
            return ContextGuard {
                ctx: Some(ctx),
                inner: self.inner.clone(),
            };
        }
        let (tx, rx) = oneshot::channel();
        self.inner.waiters.lock().push_back(tx);
        match rx.await {
            Ok(ctx) => ContextGuard {
                ctx: Some(ctx),
                inner: self.inner.clone(),
            },
            Err(_) => unreachable!("waiter sender dropped without a context; pool invariant violated"),
        }
    }

    /// `// {node_type}: {name}\n// File: {file_path}\n\n{snippet}`, with an
    /// optional preset-specific prefix prepended, embedded as a query
    /// (spec §4.3).
    pub async fn embed_query(&self, prepared_text: &str, query_prefix: Option<&str>) -> Result<Vec<f32>, CodeGraphError> {
        self.embed(prepared_text, query_prefix).await
    }

    pub async fn embed_document(&self, prepared_text: &str, document_prefix: Option<&str>) -> Result<Vec<f32>, CodeGraphError> {
        self.embed(prepared_text, document_prefix).await
    }

    async fn embed(&self, prepared_text: &str, prefix: Option<&str>) -> Result<Vec<f32>, CodeGraphError> {
        let text = match prefix {
            Some(p) => format!("{p}{prepared_text}"),
            None => prepared_text.to_string(),
        };
        let guard = self.acquire().await;
        guard.context().embed(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{DeterministicFakeBackend, FAKE_DIMENSIONS};

    #[tokio::test]
    async fn embeds_and_releases_context_back_to_free_list() {
        let pool = EmbeddingPool::new(DeterministicFakeBackend::new(), 1);
        pool.initialize().unwrap();
        let v = pool.embed_document("hello", None).await.unwrap();
        assert_eq!(v.len(), FAKE_DIMENSIONS);
        assert_eq!(pool.inner.free.lock().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_the_bounded_pool() {
        let pool = Arc::new(EmbeddingPool::new(DeterministicFakeBackend::new(), 2));
        pool.initialize().unwrap();
        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.embed_document(&format!("doc-{i}"), None).await.unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().len(), FAKE_DIMENSIONS);
        }
        assert_eq!(pool.inner.free.lock().len(), 2);
    }

    #[tokio::test]
    async fn overflow_error_is_distinguishable() {
        let pool = EmbeddingPool::new(DeterministicFakeBackend::with_overflow_threshold(4), 1);
        pool.initialize().unwrap();
        let err = pool.embed_document("way too long", None).await.unwrap_err();
        assert!(err.is_context_overflow());
    }
}
