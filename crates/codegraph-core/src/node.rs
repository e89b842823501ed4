//! The discriminated node model (spec §3.2, §9 "discriminated node variants").

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// The node's discriminant. Doubles as the `{node_type}` segment of its
/// [`NodeId`] — its `Display` impl must stay stable, since changing it
/// changes every node ID in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Function,
    Class,
    Method,
    Interface,
    TypeAlias,
    Variable,
    SyntheticType,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Function => "Function",
            NodeType::Class => "Class",
            NodeType::Method => "Method",
            NodeType::Interface => "Interface",
            NodeType::TypeAlias => "TypeAlias",
            NodeType::Variable => "Variable",
            NodeType::SyntheticType => "SyntheticType",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for NodeType {
    type Err = crate::error::CodeGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Function" => NodeType::Function,
            "Class" => NodeType::Class,
            "Method" => NodeType::Method,
            "Interface" => NodeType::Interface,
            "TypeAlias" => NodeType::TypeAlias,
            "Variable" => NodeType::Variable,
            "SyntheticType" => NodeType::SyntheticType,
            other => {
                return Err(crate::error::CodeGraphError::Validation(format!(
                    "unknown node type '{other}'"
                )))
            }
        })
    }
}

/// `public | private | protected`, defaulting to `public` (spec §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
}

/// `{name, type?}` — a function/method parameter, recorded as normalized
/// source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPayload {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub is_async: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPayload {
    pub extends: Option<String>,
    pub implements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodPayload {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub visibility: Visibility,
    pub is_static: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfacePayload {
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAliasPayload {
    pub aliased_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePayload {
    pub is_const: bool,
    pub variable_type: Option<String>,
}

/// `SyntheticType` nodes carry no variant-specific attributes of their own —
/// they exist purely as an edge target (spec §3.2).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticTypePayload;

/// Per-variant attributes. All optional at the `Node` level in the spec's own
/// wording; modeled here as a sum type so a `Function` node cannot carry a
/// `ClassPayload` at the type level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodePayload {
    Function(FunctionPayload),
    Class(ClassPayload),
    Method(MethodPayload),
    Interface(InterfacePayload),
    TypeAlias(TypeAliasPayload),
    Variable(VariablePayload),
    SyntheticType(SyntheticTypePayload),
}

impl NodePayload {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodePayload::Function(_) => NodeType::Function,
            NodePayload::Class(_) => NodeType::Class,
            NodePayload::Method(_) => NodeType::Method,
            NodePayload::Interface(_) => NodeType::Interface,
            NodePayload::TypeAlias(_) => NodeType::TypeAlias,
            NodePayload::Variable(_) => NodeType::Variable,
            NodePayload::SyntheticType(_) => NodeType::SyntheticType,
        }
    }
}

/// A symbol-level entity in the indexed code. Header fields are common to
/// every variant; `payload` carries the variant-specific attributes (spec
/// §9: "tagged sum with a common header").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub package: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub exported: bool,
    pub content_hash: Option<String>,
    pub snippet: String,
    pub payload: NodePayload,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        self.payload.node_type()
    }

    /// `end_line >= start_line >= 1` (spec §3.2 invariant).
    pub fn has_valid_line_range(&self) -> bool {
        self.start_line >= 1 && self.end_line >= self.start_line
    }

    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(node_type: NodeType) -> Node {
        Node {
            id: NodeId::new("src/a.ts:Function:doThing"),
            name: "doThing".to_string(),
            package: "root".to_string(),
            file_path: "src/a.ts".to_string(),
            start_line: 1,
            end_line: 3,
            exported: true,
            content_hash: None,
            snippet: "function doThing() {}".to_string(),
            payload: match node_type {
                NodeType::Function => NodePayload::Function(FunctionPayload::default()),
                _ => NodePayload::Variable(VariablePayload::default()),
            },
        }
    }

    #[test]
    fn valid_line_range_requires_start_at_least_one() {
        let mut n = node(NodeType::Function);
        n.start_line = 0;
        n.end_line = 0;
        assert!(!n.has_valid_line_range());
    }

    #[test]
    fn valid_line_range_requires_end_gte_start() {
        let mut n = node(NodeType::Function);
        n.start_line = 5;
        n.end_line = 3;
        assert!(!n.has_valid_line_range());
    }

    #[test]
    fn node_type_matches_payload() {
        let n = node(NodeType::Function);
        assert_eq!(n.node_type(), NodeType::Function);
    }
}
