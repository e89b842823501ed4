//! Symbol resolution, dependency/dependents/paths queries, and output
//! formatting (components C9/C10/C11, spec §4.6, §4.9, §4.10). Depends on
//! the graph store and the resolver, but never on extraction (spec §9
//! "module boundaries").

pub mod edit_distance;
pub mod engine;
pub mod formatter;
pub mod resolver;

pub use edit_distance::{levenshtein, sort_by_distance_to};
pub use engine::{connect_seeds, dependencies_of, dependents_of, paths_between, QueryOptions, QueryResult};
pub use formatter::{build_layout, compute_display_names, render, GraphLayout, OutputFormat};
pub use resolver::{apply_class_method_fallback, methods_of_class, resolve_symbol, Candidate, ClassMethodFallback, Resolution};
