//! Ingestion: turns TypeScript/TSX source trees into graph nodes/edges and
//! search documents (spec §4.7), keeps them in sync with the filesystem via
//! a manifest and a debounced watcher (spec §4.8), and exposes the whole
//! thing as one orchestrating [`IngestionService`].

pub mod fallback;
pub mod manifest;
pub mod pipeline;
pub mod project;
pub mod service;
pub mod watcher;

pub use fallback::{embed_with_fallback, EmbeddedContent};
pub use manifest::{Manifest, ManifestEntry, ReconcileAction};
pub use pipeline::{clear_file, ingest_file, FileIndexResult};
pub use project::{discover_files, ingest_project, ProjectIngestOutcome};
pub use service::IngestionService;
pub use watcher::{FileWatcher, WatchBatch};
