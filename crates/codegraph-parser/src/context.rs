//! Extraction context and cross-file import resolution (spec §4.2).

use std::collections::HashMap;

use codegraph_core::{normalize_path, NodeId};

/// `{file_path, package, project_registry?}` handed to the extractor for one
/// file. `file_path` is normalized on construction so every emitted node ID
/// uses the canonical form.
#[derive(Debug, Clone)]
pub struct ExtractionContext<'a> {
    pub file_path: String,
    pub package: String,
    pub project_registry: Option<&'a dyn ImportResolver>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(file_path: &str, package: &str) -> Self {
        Self {
            file_path: normalize_path(file_path),
            package: package.to_string(),
            project_registry: None,
        }
    }

    pub fn with_registry(mut self, registry: &'a dyn ImportResolver) -> Self {
        self.project_registry = Some(registry);
        self
    }
}

/// Resolves an imported name to the node ID it was exported under. The
/// extractor never touches the graph store directly (spec §4.2.2); this is
/// the one seam through which cross-file knowledge enters, supplied by the
/// orchestrator (C7) which has already extracted the rest of the project.
pub trait ImportResolver {
    fn resolve(&self, file_path: &str, symbol_name: &str) -> Option<NodeId>;
}

/// A resolver that never resolves anything — the default for single-file
/// extraction and tests.
pub struct NullImportResolver;

impl ImportResolver for NullImportResolver {
    fn resolve(&self, _file_path: &str, _symbol_name: &str) -> Option<NodeId> {
        None
    }
}

/// An in-memory table of `(file_path, exported_name) -> NodeId`, built
/// incrementally by the orchestrator as it extracts each file in a project
/// and consulted by every subsequent file's import map.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    exports: HashMap<(String, String), NodeId>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, file_path: &str, name: &str, id: NodeId) {
        self.exports.insert((normalize_path(file_path), name.to_string()), id);
    }
}

/// Extensions tried, in order, when a specifier resolves to an extension-less
/// path (`./util` -> `src/util`) against the extension-qualified paths
/// `record` stores nodes under.
const CANDIDATE_EXTENSIONS: [&str; 2] = ["ts", "tsx"];

impl ImportResolver for ProjectRegistry {
    fn resolve(&self, file_path: &str, symbol_name: &str) -> Option<NodeId> {
        let normalized = normalize_path(file_path);
        if let Some(id) = self.exports.get(&(normalized.clone(), symbol_name.to_string())) {
            return Some(id.clone());
        }
        CANDIDATE_EXTENSIONS.iter().find_map(|ext| {
            self.exports
                .get(&(format!("{normalized}.{ext}"), symbol_name.to_string()))
                .cloned()
        })
    }
}

/// Resolves a relative module specifier (`./foo`, `../bar/baz`) against the
/// importing file's path to the normalized path of the file it names.
/// Bare/package specifiers (no leading `.`) are left unresolved: they name an
/// external package, which has no node in the graph.
pub fn resolve_relative_specifier(importing_file: &str, specifier: &str) -> Option<String> {
    if !specifier.starts_with('.') {
        return None;
    }
    let base_dir = match importing_file.rfind('/') {
        Some(idx) => &importing_file[..idx],
        None => "",
    };
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in specifier.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    Some(normalize_path(&joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_sibling_specifier() {
        assert_eq!(
            resolve_relative_specifier("src/a.ts", "./b"),
            Some("src/b".to_string())
        );
    }

    #[test]
    fn resolves_parent_directory_specifier() {
        assert_eq!(
            resolve_relative_specifier("src/nested/a.ts", "../b"),
            Some("src/b".to_string())
        );
    }

    #[test]
    fn bare_specifier_is_unresolved() {
        assert_eq!(resolve_relative_specifier("src/a.ts", "react"), None);
    }

    #[test]
    fn project_registry_round_trips() {
        let mut registry = ProjectRegistry::new();
        let id = NodeId::new("src/b.ts:Function:helper");
        registry.record("src/b.ts", "helper", id.clone());
        assert_eq!(registry.resolve("src/b.ts", "helper"), Some(id));
        assert_eq!(registry.resolve("src/b.ts", "missing"), None);
    }

    /// `resolve_relative_specifier` strips the extension a bare `./util`
    /// specifier never had; the registry must still find the node recorded
    /// under `util.ts`.
    #[test]
    fn project_registry_resolves_extension_less_specifier_path() {
        let mut registry = ProjectRegistry::new();
        let id = NodeId::new("src/util.ts:Function:helper");
        registry.record("src/util.ts", "helper", id.clone());
        assert_eq!(registry.resolve("src/util", "helper"), Some(id));
    }

    #[test]
    fn project_registry_resolves_extension_less_tsx_specifier_path() {
        let mut registry = ProjectRegistry::new();
        let id = NodeId::new("src/widget.tsx:Function:Widget");
        registry.record("src/widget.tsx", "Widget", id.clone());
        assert_eq!(registry.resolve("src/widget", "Widget"), Some(id));
    }
}
