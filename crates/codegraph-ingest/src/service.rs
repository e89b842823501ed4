//! Orchestration (component C7/C8, spec §4.7, §4.8): ties the ingestion
//! pipeline, project sweep, manifest, and watcher together into the surface
//! a host process actually drives — initial index, startup reconciliation,
//! and live watching.

use std::path::{Path, PathBuf};

use codegraph_core::{normalize_path, PackageConfig, Result};
use codegraph_graph::CodeGraph;
use codegraph_parser::{ExtractionContext, ProjectRegistry, TypeScriptSource};
use codegraph_vector::{EmbeddingPool, HybridIndex, InferenceBackend};
use tokio::sync::Mutex;
use tracing::{info, warn};

use codegraph_cache::EmbeddingCache;

use crate::manifest::{self, Manifest, ManifestEntry, ReconcileAction};
use crate::pipeline;
use crate::project::{self, ProjectIngestOutcome};
use crate::watcher::{FileWatcher, WatchBatch};

const SOURCE_EXTENSIONS: [&str; 2] = ["ts", "tsx"];

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.ends_with(".d.ts") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Drives ingestion for a fixed set of packages against one graph/search/
/// embedding backend triple (spec §6's `packages` + `watch.*` configuration
/// subsections).
pub struct IngestionService<B: InferenceBackend> {
    graph: CodeGraph,
    search_index: HybridIndex,
    pool: EmbeddingPool<B>,
    cache: EmbeddingCache,
    document_prefix: Option<String>,
    packages: Vec<PackageConfig>,
    manifest_path: PathBuf,
    debounce_ms: u64,
    manifest: Mutex<Manifest>,
}

impl<B: InferenceBackend> IngestionService<B> {
    pub fn new(
        graph: CodeGraph,
        search_index: HybridIndex,
        pool: EmbeddingPool<B>,
        cache: EmbeddingCache,
        document_prefix: Option<String>,
        packages: Vec<PackageConfig>,
        manifest_path: PathBuf,
        debounce_ms: u64,
    ) -> Result<Self> {
        let manifest = Manifest::load(&manifest_path)?;
        Ok(Self {
            graph,
            search_index,
            pool,
            cache,
            document_prefix,
            packages,
            manifest_path,
            debounce_ms,
            manifest: Mutex::new(manifest),
        })
    }

    /// The underlying graph store, for a host to query once ingestion has run.
    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    fn package_root(&self, package_name: &str) -> Option<&Path> {
        self.packages
            .iter()
            .find(|p| p.name == package_name)
            .map(|p| p.compilation_root_path.as_path())
    }

    fn relative_path_for(&self, package_name: &str, absolute: &Path) -> Option<String> {
        let root = self.package_root(package_name)?;
        let relative = absolute.strip_prefix(root).ok()?;
        Some(normalize_path(&relative.to_string_lossy()))
    }

    /// Indexes every configured package from scratch and writes a fresh
    /// manifest entry per ingested file.
    pub async fn run_initial_index(&self) -> Result<ProjectIngestOutcome> {
        let outcome = project::ingest_project(
            &self.graph,
            &self.search_index,
            &self.pool,
            &self.cache,
            self.document_prefix.as_deref(),
            &self.packages,
        )
        .await?;

        let mut manifest = self.manifest.lock().await;
        for package in &self.packages {
            for path in project::discover_files(&package.compilation_root_path) {
                let Some(relative) = self.relative_path_for(&package.name, &path) else {
                    continue;
                };
                if let Ok(metadata) = std::fs::metadata(&path) {
                    manifest.record(&relative, ManifestEntry::from_metadata(&metadata, None)?);
                }
            }
        }
        manifest.save(&self.manifest_path)?;
        Ok(outcome)
    }

    /// Diffs the manifest against the filesystem (spec §4.8 "On startup"),
    /// reindexing changed/new files and removing deleted ones. One manifest
    /// spans every configured package, so this splits it into one
    /// per-package sub-manifest — entries whose file is found under a
    /// package's root belong to that package — and runs [`manifest::reconcile`]
    /// against each; entries found under no package root at all are gone
    /// regardless of which package originally indexed them.
    pub async fn reconcile_on_startup(&self) -> Result<Vec<ReconcileAction>> {
        let mut actions = Vec::new();

        let snapshot: std::collections::HashMap<String, ManifestEntry> = {
            let manifest = self.manifest.lock().await;
            manifest.files.clone()
        };
        let mut assigned = std::collections::HashSet::new();

        for package in &self.packages {
            let mut sub_manifest = Manifest::new();
            for (relative, entry) in &snapshot {
                if assigned.contains(relative) {
                    continue;
                }
                if package.compilation_root_path.join(relative).exists() {
                    sub_manifest.record(relative, entry.clone());
                    assigned.insert(relative.clone());
                }
            }

            let tracked: Vec<String> = project::discover_files(&package.compilation_root_path)
                .into_iter()
                .filter_map(|path| self.relative_path_for(&package.name, &path))
                .collect();

            actions.extend(manifest::reconcile(&sub_manifest, &package.compilation_root_path, &tracked)?);
        }

        for relative in snapshot.keys() {
            if !assigned.contains(relative) {
                actions.push(ReconcileAction::Remove(relative.clone()));
            }
        }

        for action in &actions {
            match action {
                ReconcileAction::Reindex(relative) => {
                    if let Some((package_name, absolute)) = self.locate(relative) {
                        if let Err(e) = self.reindex_one(&package_name, &absolute, relative).await {
                            warn!(file = %relative, error = %e, "reconciliation reindex failed");
                        }
                    }
                }
                ReconcileAction::Remove(relative) => {
                    self.remove_one(relative)?;
                }
            }
        }

        let manifest = self.manifest.lock().await;
        manifest.save(&self.manifest_path)?;
        Ok(actions)
    }

    fn locate(&self, relative: &str) -> Option<(String, PathBuf)> {
        self.packages.iter().find_map(|package| {
            let candidate = package.compilation_root_path.join(relative);
            candidate.exists().then(|| (package.name.clone(), candidate))
        })
    }

    fn remove_one(&self, relative: &str) -> Result<()> {
        self.graph.remove_file_nodes(relative)?;
        self.search_index.remove_by_file(relative);
        Ok(())
    }

    async fn reindex_one(&self, package_name: &str, absolute: &Path, relative: &str) -> Result<()> {
        let content = std::fs::read_to_string(absolute)?;
        let source = TypeScriptSource::parse_for_path(&content, absolute)
            .map_err(|e| codegraph_core::CodeGraphError::validation(e.to_string()))?;
        // Cross-file registry is rebuilt fresh here rather than carried from
        // initial indexing: a single-file reindex only needs the exports
        // already recorded in the graph from prior ingestion, which this
        // single-file registry intentionally does not attempt to replicate.
        // Resolution against symbols exported by files ingested earlier in
        // the same run still works via C3's local-name table.
        let registry = ProjectRegistry::new();
        let ctx = ExtractionContext::new(relative, package_name).with_registry(&registry);

        pipeline::clear_file(&self.graph, &self.search_index, relative)?;
        pipeline::ingest_file(
            &self.graph,
            &self.search_index,
            &self.pool,
            &self.cache,
            self.document_prefix.as_deref(),
            &source,
            &ctx,
        )
        .await?;

        let metadata = std::fs::metadata(absolute)?;
        let mut manifest = self.manifest.lock().await;
        manifest.record(relative, ManifestEntry::from_metadata(&metadata, None)?);
        Ok(())
    }

    /// Runs the live watch loop forever (spec §4.8 "Live watching"). One
    /// [`FileWatcher`] per package root; batches from every package funnel
    /// into a single sequential processing loop, which is what rules out two
    /// concurrent reindexes of the same path (spec §5 "two concurrent
    /// reindexes of the same path are forbidden").
    pub async fn watch_forever(&self) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(String, WatchBatch)>();
        for package in &self.packages {
            let mut watcher = FileWatcher::watch(&package.compilation_root_path, self.debounce_ms)?;
            let tx = tx.clone();
            let name = package.name.clone();
            tokio::spawn(async move {
                while let Some(batch) = watcher.next_batch().await {
                    if tx.send((name.clone(), batch)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        while let Some((package_name, batch)) = rx.recv().await {
            self.process_batch(&package_name, batch).await;
        }
        Ok(())
    }

    async fn process_batch(&self, package_name: &str, batch: WatchBatch) {
        for path in &batch.removed {
            if !is_source_file(path) {
                continue;
            }
            let Some(relative) = self.relative_path_for(package_name, path) else {
                continue;
            };
            if let Err(e) = self.remove_one(&relative) {
                warn!(file = %relative, error = %e, "watcher remove failed");
                continue;
            }
            self.manifest.lock().await.remove(&relative);
        }

        for path in &batch.changed {
            if !path.exists() || !is_source_file(path) {
                continue;
            }
            let Some(relative) = self.relative_path_for(package_name, path) else {
                continue;
            };
            match self.reindex_one(package_name, path, &relative).await {
                Ok(()) => info!(file = %relative, "watcher reindex succeeded"),
                Err(e) => warn!(file = %relative, error = %e, "watcher reindex failed"),
            }
        }

        let manifest = self.manifest.lock().await;
        if let Err(e) = manifest.save(&self.manifest_path) {
            warn!(error = %e, "failed to persist manifest after watch batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_vector::DeterministicFakeBackend;

    fn service(dir: &std::path::Path, project_dir: PathBuf) -> IngestionService<DeterministicFakeBackend> {
        let graph = CodeGraph::open(&dir.join("graph.db")).unwrap();
        let search_index = HybridIndex::new();
        let pool = EmbeddingPool::new(DeterministicFakeBackend::new(), 1);
        pool.initialize().unwrap();
        let cache = EmbeddingCache::new();
        let packages = vec![PackageConfig {
            name: "root".to_string(),
            compilation_root_path: project_dir,
        }];
        IngestionService::new(
            graph,
            search_index,
            pool,
            cache,
            None,
            packages,
            dir.join("manifest.json"),
            50,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn initial_index_then_reconcile_is_a_no_op_when_nothing_changed() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("proj");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("a.ts"), "export function f(): void {}\n").unwrap();

        let service = service(dir.path(), project_dir);
        let outcome = service.run_initial_index().await.unwrap();
        assert_eq!(outcome.file_results.len(), 1);

        let actions = service.reconcile_on_startup().await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn reconcile_detects_an_offline_edit() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("proj");
        std::fs::create_dir_all(&project_dir).unwrap();
        let file_path = project_dir.join("a.ts");
        std::fs::write(&file_path, "export function f(): void {}\n").unwrap();

        let service = service(dir.path(), project_dir.clone());
        service.run_initial_index().await.unwrap();

        // Simulate an edit made while the service wasn't running.
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&file_path, "export function f(): void { g(); }\nfunction g(): void {}\n").unwrap();

        let actions = service.reconcile_on_startup().await.unwrap();
        assert_eq!(actions, vec![ReconcileAction::Reindex("a.ts".to_string())]);

        let nodes = service.graph.find_nodes_by_symbol("g", Some("a.ts"));
        assert_eq!(nodes.len(), 1);
    }

    #[tokio::test]
    async fn reconcile_detects_an_offline_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("proj");
        std::fs::create_dir_all(&project_dir).unwrap();
        let file_path = project_dir.join("a.ts");
        std::fs::write(&file_path, "export function f(): void {}\n").unwrap();

        let service = service(dir.path(), project_dir.clone());
        service.run_initial_index().await.unwrap();

        std::fs::remove_file(&file_path).unwrap();
        let actions = service.reconcile_on_startup().await.unwrap();
        assert_eq!(actions, vec![ReconcileAction::Remove("a.ts".to_string())]);
        assert!(service.graph.find_nodes_by_symbol("f", Some("a.ts")).is_empty());
    }
}
