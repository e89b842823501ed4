//! Parses `import` statements into a local-name -> (source file, imported
//! name, type-only) table (spec §4.2.2's "import map").

use std::collections::HashMap;

use tree_sitter::Node as TsNode;

use crate::util::{direct_child_of_kind, node_text};

#[derive(Debug, Clone)]
pub struct ImportBinding {
    /// The normalized file this name was imported from, if the specifier was
    /// relative and resolvable. `None` for bare/package specifiers.
    pub source_file: Option<String>,
    /// The name as exported by the source module (equals the local name
    /// unless the import used an `as` alias).
    pub imported_name: String,
    pub type_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    bindings: HashMap<String, ImportBinding>,
}

impl ImportMap {
    pub fn get(&self, local_name: &str) -> Option<&ImportBinding> {
        self.bindings.get(local_name)
    }

    /// `(local_name, binding)` pairs, consulted when building the edge
    /// extractor's type/callable maps (spec §4.2.2).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ImportBinding)> {
        self.bindings.iter()
    }

    fn insert(&mut self, local_name: String, binding: ImportBinding) {
        self.bindings.insert(local_name, binding);
    }
}

/// Builds the import map from every top-level `import_statement` in the
/// file, resolving relative specifiers against `file_path`.
pub fn build_import_map(root: TsNode, content: &str, file_path: &str) -> ImportMap {
    let mut map = ImportMap::default();
    let mut cursor = root.walk();
    for top in root.children(&mut cursor) {
        if top.kind() != "import_statement" {
            continue;
        }
        let stmt_text = node_text(content, top);
        let statement_type_only = stmt_text.trim_start().starts_with("import type");

        let Some(source) = import_source(top, content) else {
            continue;
        };
        let resolved = crate::context::resolve_relative_specifier(file_path, &source);

        let Some(clause) = direct_child_of_kind(top, "import_clause") else {
            continue; // a side-effect-only `import './foo'`
        };

        if let Some(default_name) = direct_child_of_kind(clause, "identifier") {
            let name = node_text(content, default_name);
            map.insert(
                name.clone(),
                ImportBinding {
                    source_file: resolved.clone(),
                    imported_name: "default".to_string(),
                    type_only: statement_type_only,
                },
            );
        }

        if let Some(named) = direct_child_of_kind(clause, "named_imports") {
            let mut spec_cursor = named.walk();
            for spec in named.children(&mut spec_cursor) {
                if spec.kind() != "import_specifier" {
                    continue;
                }
                let spec_text = node_text(content, spec);
                let specifier_type_only = spec_text.trim_start().starts_with("type ");
                let names: Vec<TsNode> = {
                    let mut c = spec.walk();
                    spec.children(&mut c)
                        .filter(|n| n.kind() == "identifier" || n.kind() == "type_identifier")
                        .collect()
                };
                let (imported, local) = match names.as_slice() {
                    [only] => (node_text(content, *only), node_text(content, *only)),
                    [first, second] => (node_text(content, *first), node_text(content, *second)),
                    _ => continue,
                };
                map.insert(
                    local,
                    ImportBinding {
                        source_file: resolved.clone(),
                        imported_name: imported,
                        type_only: statement_type_only || specifier_type_only,
                    },
                );
            }
        }

        if let Some(ns) = direct_child_of_kind(clause, "namespace_import") {
            if let Some(ident) = direct_child_of_kind(ns, "identifier") {
                let name = node_text(content, ident);
                map.insert(
                    name,
                    ImportBinding {
                        source_file: resolved.clone(),
                        imported_name: "*".to_string(),
                        type_only: statement_type_only,
                    },
                );
            }
        }
    }
    map
}

fn import_source(import_stmt: TsNode, content: &str) -> Option<String> {
    let string_node = direct_child_of_kind(import_stmt, "string")?;
    let raw = node_text(content, string_node);
    Some(raw.trim_matches(|c| c == '\'' || c == '"' || c == '`').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::{SourceTree, TypeScriptSource};

    #[test]
    fn maps_named_import_to_its_resolved_file() {
        let src = TypeScriptSource::parse("import { helper } from './util';\n").unwrap();
        let map = build_import_map(src.root(), src.content(), "src/a.ts");
        let binding = map.get("helper").unwrap();
        assert_eq!(binding.source_file.as_deref(), Some("src/util"));
        assert_eq!(binding.imported_name, "helper");
        assert!(!binding.type_only);
    }

    #[test]
    fn maps_aliased_named_import() {
        let src = TypeScriptSource::parse("import { helper as h } from './util';\n").unwrap();
        let map = build_import_map(src.root(), src.content(), "src/a.ts");
        let binding = map.get("h").unwrap();
        assert_eq!(binding.imported_name, "helper");
    }

    #[test]
    fn marks_type_only_import() {
        let src = TypeScriptSource::parse("import type { User } from './user';\n").unwrap();
        let map = build_import_map(src.root(), src.content(), "src/a.ts");
        assert!(map.get("User").unwrap().type_only);
    }

    #[test]
    fn bare_specifier_is_unresolved_but_still_mapped() {
        let src = TypeScriptSource::parse("import { useState } from 'react';\n").unwrap();
        let map = build_import_map(src.root(), src.content(), "src/a.ts");
        assert_eq!(map.get("useState").unwrap().source_file, None);
    }
}
