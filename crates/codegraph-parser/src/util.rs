//! Small resilient AST helpers shared by node and edge extraction. Scanning
//! immediate children by `kind()` (rather than field names) tolerates minor
//! grammar-version drift, the same resilience the teacher's
//! `child_text_by_kinds` relies on.

use tree_sitter::Node as TsNode;

pub fn node_text(content: &str, node: TsNode) -> String {
    node.utf8_text(content.as_bytes()).unwrap_or_default().to_string()
}

/// 1-indexed inclusive `(start_line, end_line)`.
pub fn node_location(node: TsNode) -> (u32, u32) {
    (node.start_position().row as u32 + 1, node.end_position().row as u32 + 1)
}

pub fn direct_child_of_kind<'a>(node: TsNode<'a>, kind: &str) -> Option<TsNode<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

pub fn direct_children_of_kind<'a>(node: TsNode<'a>, kind: &str) -> Vec<TsNode<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).filter(|c| c.kind() == kind).collect()
}

pub fn direct_child_of_any_kind<'a>(node: TsNode<'a>, kinds: &[&str]) -> Option<TsNode<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| kinds.contains(&c.kind()))
}

/// The first immediate child name-like token, used for declaration names.
pub fn child_name(content: &str, node: TsNode) -> Option<String> {
    direct_child_of_any_kind(node, &["identifier", "type_identifier", "property_identifier"])
        .map(|n| node_text(content, n))
}

pub fn starts_with_keyword(content: &str, node: TsNode, keyword: &str) -> bool {
    node_text(content, node).trim_start().starts_with(keyword)
}

/// A type-annotation node's text is `: Type`; strips the leading colon and
/// surrounding whitespace.
pub fn strip_type_annotation(raw: &str) -> String {
    raw.trim_start_matches(':').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::{SourceTree, TypeScriptSource};

    #[test]
    fn finds_function_name_via_child_scan() {
        let src = TypeScriptSource::parse("function doThing() {}").unwrap();
        let func = direct_child_of_any_kind(src.root(), &["function_declaration"]).unwrap();
        assert_eq!(child_name(src.content(), func), Some("doThing".to_string()));
    }
}
