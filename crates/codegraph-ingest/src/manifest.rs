//! The index manifest (spec §3.3, §6 "Persisted state layout"): a JSON
//! document mapping relative file path to `{mtime_ns, size_bytes,
//! content_hash?}`, written after each batch of per-file reindexes and
//! consulted on startup to detect files that changed while the watcher
//! wasn't running (spec §4.8).

use std::collections::HashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use codegraph_core::{normalize_path, CodeGraphError, Result};
use serde::{Deserialize, Serialize};

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub mtime_ns: u128,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl ManifestEntry {
    pub fn from_metadata(metadata: &std::fs::Metadata, content_hash: Option<String>) -> Result<Self> {
        let mtime_ns = metadata
            .modified()
            .map_err(CodeGraphError::Io)?
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CodeGraphError::storage(format!("file mtime before epoch: {e}")))?
            .as_nanos();
        Ok(Self {
            mtime_ns,
            size_bytes: metadata.len(),
            content_hash,
        })
    }

    /// Whether this entry still matches what's on disk — spec §4.8 schedules
    /// a reindex when either differs.
    fn matches(&self, metadata: &std::fs::Metadata) -> bool {
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        let Ok(duration) = modified.duration_since(UNIX_EPOCH) else {
            return false;
        };
        duration.as_nanos() == self.mtime_ns && metadata.len() == self.size_bytes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub files: HashMap<String, ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            files: HashMap::new(),
        }
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing file reads as an empty manifest — there's nothing to
    /// reconcile against on a first run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&raw)?;
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn record(&mut self, relative_path: &str, entry: ManifestEntry) {
        self.files.insert(normalize_path(relative_path), entry);
    }

    pub fn remove(&mut self, relative_path: &str) {
        self.files.remove(&normalize_path(relative_path));
    }

    pub fn get(&self, relative_path: &str) -> Option<&ManifestEntry> {
        self.files.get(&normalize_path(relative_path))
    }
}

/// One reconciliation action: a file whose on-disk state disagrees with the
/// manifest (spec §4.8 "On startup ... reconcile the manifest against the
/// filesystem").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    Reindex(String),
    Remove(String),
}

/// Diffs the manifest against the filesystem rooted at `root`.
///
/// - Manifest entries whose file is gone become [`ReconcileAction::Remove`].
/// - Manifest entries whose `mtime_ns`/`size_bytes` no longer match become
///   [`ReconcileAction::Reindex`].
/// - Files under `tracked_paths` present on disk but absent from the
///   manifest become [`ReconcileAction::Reindex`] ("new files present on
///   disk but absent from the manifest").
pub fn reconcile(manifest: &Manifest, root: &Path, tracked_paths: &[String]) -> Result<Vec<ReconcileAction>> {
    let mut actions = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for (relative_path, entry) in &manifest.files {
        seen.insert(relative_path.clone());
        let absolute = root.join(relative_path);
        match std::fs::metadata(&absolute) {
            Ok(metadata) => {
                if !entry.matches(&metadata) {
                    actions.push(ReconcileAction::Reindex(relative_path.clone()));
                }
            }
            Err(_) => actions.push(ReconcileAction::Remove(relative_path.clone())),
        }
    }

    for path in tracked_paths {
        let normalized = normalize_path(path);
        if !seen.contains(&normalized) {
            actions.push(ReconcileAction::Reindex(normalized));
        }
    }

    Ok(actions)
}
