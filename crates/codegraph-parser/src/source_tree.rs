//! Thin wrapper around `tree_sitter::Tree` so the extractor is written
//! against a small trait rather than the grammar crate directly.

use std::path::Path;

use thiserror::Error;
use tree_sitter::{Node as TsNode, Parser};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to load the TypeScript grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("tree-sitter failed to produce a parse tree")]
    Failed,
}

/// A parsed source file. Exposes only what the extractor needs — the root
/// node and the original text nodes reference into.
pub trait SourceTree {
    fn root(&self) -> TsNode<'_>;
    fn content(&self) -> &str;
}

/// Which tree-sitter-typescript grammar to parse a source with. Plain `.ts`
/// never contains JSX syntax; `.tsx` needs the JSX-aware grammar for
/// `jsx_opening_element`/`jsx_self_closing_element` nodes to appear at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
}

pub struct TypeScriptSource {
    tree: tree_sitter::Tree,
    content: String,
}

impl TypeScriptSource {
    /// Parses as plain TypeScript. Use [`Self::parse_for_path`] when the
    /// source may be a `.tsx` file.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        Self::parse_as(content, Dialect::TypeScript)
    }

    pub fn parse_as(content: &str, dialect: Dialect) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let language = match dialect {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        };
        parser.set_language(&language)?;
        let tree = parser.parse(content, None).ok_or(ParseError::Failed)?;
        Ok(Self {
            tree,
            content: content.to_string(),
        })
    }

    /// Picks the TSX grammar when `path` has a `.tsx` extension, else plain
    /// TypeScript. The two grammars otherwise parse identical `.ts` input
    /// the same way, so this is safe to call unconditionally from callers
    /// that discover files by extension.
    pub fn parse_for_path(content: &str, path: &Path) -> Result<Self, ParseError> {
        let dialect = match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        };
        Self::parse_as(content, dialect)
    }
}

impl SourceTree for TypeScriptSource {
    fn root(&self) -> TsNode<'_> {
        self.tree.root_node()
    }

    fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_file() {
        let source = TypeScriptSource::parse("function f() {}").unwrap();
        assert_eq!(source.root().kind(), "program");
    }
}
