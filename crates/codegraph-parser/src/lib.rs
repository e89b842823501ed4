//! TypeScript symbol/edge extraction (component C3, spec §4.2).
//!
//! The extractor walks one parsed source file under an [`ExtractionContext`]
//! and emits the node set and edge set spec §4.2 names. It never touches the
//! graph store: edges reference nodes by [`codegraph_core::NodeId`] only, and
//! cross-file resolution goes through [`context::ImportResolver`], supplied
//! by the ingestion orchestrator.

pub mod context;
pub mod edges;
pub mod extractor;
pub mod import_map;
pub mod normalize;
pub mod source_tree;
pub mod util;

pub use context::{ExtractionContext, ImportResolver, NullImportResolver, ProjectRegistry};
pub use extractor::{extract, ExtractError, ExtractionOutcome, FileOutcome};
pub use source_tree::{Dialect, ParseError, SourceTree, TypeScriptSource};
