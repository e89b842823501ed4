//! Directed typed edges between nodes (spec §3.2, GLOSSARY).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

pub use crate::ids::EdgeKey;

/// The full edge-type taxonomy named in the GLOSSARY. `UsesType`, `Contains`,
/// and `Imports` exist in the model (extraction bookkeeping / legacy
/// superset) but are excluded from [`EdgeType::default_traversal_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeType {
    Calls,
    References,
    Extends,
    Implements,
    Takes,
    Returns,
    HasType,
    HasProperty,
    UsesType,
    Includes,
    AliasFor,
    Contains,
    Imports,
}

impl EdgeType {
    /// The store's configured default edge-type set for traversal queries
    /// when none is supplied (spec §4.1): everything except the
    /// extraction-only types `CONTAINS`, `IMPORTS`, and the legacy superset
    /// `USES_TYPE`.
    pub fn default_traversal_set() -> &'static [EdgeType] {
        &[
            EdgeType::Calls,
            EdgeType::References,
            EdgeType::Extends,
            EdgeType::Implements,
            EdgeType::Takes,
            EdgeType::Returns,
            EdgeType::HasType,
            EdgeType::HasProperty,
            EdgeType::Includes,
            EdgeType::AliasFor,
        ]
    }

    /// Stable ordinal used to break ties deterministically when multiple
    /// edges connect the same pair of adjacent nodes in a path (spec §4.1).
    pub fn ordinal(&self) -> u8 {
        match self {
            EdgeType::Calls => 0,
            EdgeType::References => 1,
            EdgeType::Extends => 2,
            EdgeType::Implements => 3,
            EdgeType::Takes => 4,
            EdgeType::Returns => 5,
            EdgeType::HasType => 6,
            EdgeType::HasProperty => 7,
            EdgeType::UsesType => 8,
            EdgeType::Includes => 9,
            EdgeType::AliasFor => 10,
            EdgeType::Contains => 11,
            EdgeType::Imports => 12,
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeType::Calls => "CALLS",
            EdgeType::References => "REFERENCES",
            EdgeType::Extends => "EXTENDS",
            EdgeType::Implements => "IMPLEMENTS",
            EdgeType::Takes => "TAKES",
            EdgeType::Returns => "RETURNS",
            EdgeType::HasType => "HAS_TYPE",
            EdgeType::HasProperty => "HAS_PROPERTY",
            EdgeType::UsesType => "USES_TYPE",
            EdgeType::Includes => "INCLUDES",
            EdgeType::AliasFor => "ALIAS_FOR",
            EdgeType::Contains => "CONTAINS",
            EdgeType::Imports => "IMPORTS",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EdgeType {
    type Err = crate::error::CodeGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CALLS" => EdgeType::Calls,
            "REFERENCES" => EdgeType::References,
            "EXTENDS" => EdgeType::Extends,
            "IMPLEMENTS" => EdgeType::Implements,
            "TAKES" => EdgeType::Takes,
            "RETURNS" => EdgeType::Returns,
            "HAS_TYPE" => EdgeType::HasType,
            "HAS_PROPERTY" => EdgeType::HasProperty,
            "USES_TYPE" => EdgeType::UsesType,
            "INCLUDES" => EdgeType::Includes,
            "ALIAS_FOR" => EdgeType::AliasFor,
            "CONTAINS" => EdgeType::Contains,
            "IMPORTS" => EdgeType::Imports,
            other => {
                return Err(crate::error::CodeGraphError::Validation(format!(
                    "unknown edge type '{other}'"
                )))
            }
        })
    }
}

/// One `{start_line, end_line}` range at which a `CALLS` edge is textually
/// realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

/// `context` for a type-use edge: `parameter | return | property | variable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeUseContext {
    Parameter,
    Return,
    Property,
    Variable,
}

/// `reference_context` for a `REFERENCES` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceContext {
    Callback,
    Property,
    Array,
    Return,
    Assignment,
    Access,
}

/// Per-type optional metadata. Unused fields are `None` for edge types that
/// don't define them (spec §3.2).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    /// `CALLS`: number of textual call sites.
    pub call_count: Option<u32>,
    /// `CALLS`: ordered source-line ranges of each call site.
    pub call_sites: Option<Vec<LineRange>>,
    /// `USES_TYPE` (and the narrower TAKES/RETURNS/HAS_TYPE/HAS_PROPERTY
    /// edges the extractor actually emits in its place).
    pub context: Option<TypeUseContext>,
    /// `REFERENCES`.
    pub reference_context: Option<ReferenceContext>,
    /// `IMPORTS`: true when the import is type-only.
    pub type_only: Option<bool>,
    /// `IMPORTS`: the symbols named in the import clause.
    pub imported_symbols: Option<Vec<String>>,
}

/// A directed typed relationship between two nodes. Has no intrinsic ID: the
/// `(source, target, type)` triple is its identity (spec §3.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub metadata: EdgeMetadata,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, edge_type: EdgeType) -> Self {
        Self {
            source,
            target,
            edge_type,
            metadata: EdgeMetadata::default(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source.clone(), self.target.clone(), self.edge_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_traversal_set_excludes_extraction_only_types() {
        let set = EdgeType::default_traversal_set();
        assert!(!set.contains(&EdgeType::Contains));
        assert!(!set.contains(&EdgeType::Imports));
        assert!(!set.contains(&EdgeType::UsesType));
        assert!(set.contains(&EdgeType::Calls));
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for edge_type in [
            EdgeType::Calls,
            EdgeType::References,
            EdgeType::Extends,
            EdgeType::Implements,
            EdgeType::Takes,
            EdgeType::Returns,
            EdgeType::HasType,
            EdgeType::HasProperty,
            EdgeType::UsesType,
            EdgeType::Includes,
            EdgeType::AliasFor,
            EdgeType::Contains,
            EdgeType::Imports,
        ] {
            let rendered = edge_type.to_string();
            let parsed: EdgeType = rendered.parse().unwrap();
            assert_eq!(parsed, edge_type);
        }
    }

    #[test]
    fn edge_key_is_the_source_target_type_triple() {
        use crate::ids::NodeId;
        let a = NodeId::new("a");
        let b = NodeId::new("b");
        let edge = Edge::new(a.clone(), b.clone(), EdgeType::Calls);
        assert_eq!(edge.key(), EdgeKey::new(a, b, EdgeType::Calls));
    }
}
