//! Deterministic, string-valued node identity (spec: node-ID determinism).

use std::fmt;

use crate::node::NodeType;

/// Canonical node identifier: `{normalized_path}:{node_type}:{symbol_path}`.
///
/// Deterministic and collision-free within a single indexed repository: a
/// fresh extraction of the same file yields byte-identical IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The `{normalized_path}:{node_type}:{symbol_path}` this ID is built
    /// from, split back into its three components. Returns `None` if the ID
    /// was not constructed through [`generate_node_id`] (e.g. read back from
    /// a store that predates a format change).
    pub fn parts(&self) -> Option<(&str, &str, &str)> {
        let mut iter = self.0.splitn(3, ':');
        let path = iter.next()?;
        let node_type = iter.next()?;
        let symbol = iter.next()?;
        Some((path, node_type, symbol))
    }

    pub fn file_path(&self) -> Option<&str> {
        self.parts().map(|(path, _, _)| path)
    }

    pub fn symbol_path(&self) -> Option<&str> {
        self.parts().map(|(_, _, symbol)| symbol)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Converts `\`-separated Windows paths to `/`-separated form and strips a
/// leading `./`. Idempotent: normalizing an already-normalized path is a
/// no-op.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced.strip_prefix("./").unwrap_or(&replaced).to_string()
}

/// Dot-separated nesting path for a symbol, e.g. `ClassName.methodName` or
/// `ReturnType<typeof factoryName>.methodName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolPath {
    segments: Vec<String>,
}

impl SymbolPath {
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Parses a dotted string. A synthetic type name such as
    /// `ReturnType<typeof factoryName>` contains literal dots only inside the
    /// `<...>` pair, so splitting happens on top-level dots only (outside any
    /// `<`/`>` nesting).
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut depth = 0i32;
        let mut current = String::new();
        for ch in raw.chars() {
            match ch {
                '<' => {
                    depth += 1;
                    current.push(ch);
                }
                '>' => {
                    depth -= 1;
                    current.push(ch);
                }
                '.' if depth == 0 => {
                    segments.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
        }
        segments.push(current);
        Self { segments }
    }

    pub fn join(&self, child: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(child.into());
        Self { segments }
    }

    /// The last segment of the path — the node's display `name`.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for SymbolPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

/// Builds a [`NodeId`] from a file path, node type, and symbol path. Pure:
/// same inputs always yield the same ID.
pub fn generate_node_id(path: &str, node_type: NodeType, symbol_path: &SymbolPath) -> NodeId {
    NodeId::new(format!(
        "{}:{}:{}",
        normalize_path(path),
        node_type,
        symbol_path.to_dotted()
    ))
}

/// Identity of an edge: the spec states "an edge has no intrinsic ID" — the
/// `(source, target, type)` triple is the key used by upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: crate::edge::EdgeType,
}

impl EdgeKey {
    pub fn new(source: NodeId, target: NodeId, edge_type: crate::edge::EdgeType) -> Self {
        Self {
            source,
            target,
            edge_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_windows_separators() {
        assert_eq!(normalize_path("src\\foo\\bar.ts"), "src/foo/bar.ts");
    }

    #[test]
    fn strips_leading_dot_slash() {
        assert_eq!(normalize_path("./src/foo.ts"), "src/foo.ts");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_path("./a\\b.ts");
        let twice = normalize_path(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn generate_node_id_is_pure() {
        let symbol = SymbolPath::leaf("doThing");
        let a = generate_node_id("src/a.ts", NodeType::Function, &symbol);
        let b = generate_node_id("src/a.ts", NodeType::Function, &symbol);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "src/a.ts:Function:doThing");
    }

    #[test]
    fn generate_node_id_normalizes_windows_path() {
        let symbol = SymbolPath::leaf("doThing");
        let unix = generate_node_id("src/a.ts", NodeType::Function, &symbol);
        let windows = generate_node_id("src\\a.ts", NodeType::Function, &symbol);
        assert_eq!(unix, windows);
    }

    #[test]
    fn symbol_path_parse_handles_synthetic_type_dots() {
        let parsed = SymbolPath::parse("ReturnType<typeof factoryName>.methodName");
        assert_eq!(
            parsed.segments(),
            &["ReturnType<typeof factoryName>", "methodName"]
        );
        assert_eq!(parsed.name(), "methodName");
    }

    #[test]
    fn symbol_path_join_appends_segment() {
        let base = SymbolPath::leaf("UserService");
        let joined = base.join("save");
        assert_eq!(joined.to_dotted(), "UserService.save");
    }

    #[test]
    fn node_id_parts_roundtrip() {
        let symbol = SymbolPath::new(["UserService", "save"]);
        let id = generate_node_id("src/user.ts", NodeType::Method, &symbol);
        let (path, node_type, sym) = id.parts().unwrap();
        assert_eq!(path, "src/user.ts");
        assert_eq!(node_type, "Method");
        assert_eq!(sym, "UserService.save");
    }
}
