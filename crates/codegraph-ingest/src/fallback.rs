//! Progressive-truncation embedding fallback (spec §4.7 step 3): probe the
//! cache, then try full content, a class-signature-only rendering, halved
//! content down to a floor, and finally a metadata-only line — stopping at
//! the first attempt that doesn't overflow the backend's context window.

use codegraph_cache::{content_hash, EmbeddingCache};
use codegraph_core::{CodeGraphError, Node, NodePayload, NodeType, Result};
use codegraph_vector::{prepare_document_content, EmbeddingPool, InferenceBackend};

/// Minimum snippet length the halving loop will still attempt before giving
/// up on halving and falling back to the metadata-only attempt (spec §4.7
/// step 3c, "e.g. 100 characters").
const MIN_USEFUL_LEN: usize = 100;

pub struct EmbeddedContent {
    pub vector: Vec<f32>,
    pub content_hash: String,
}

pub fn node_type_label(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Function => "function",
        NodeType::Class => "class",
        NodeType::Method => "method",
        NodeType::Interface => "interface",
        NodeType::TypeAlias => "type alias",
        NodeType::Variable => "variable",
        NodeType::SyntheticType => "synthetic type",
    }
}

/// Keeps the class declaration line and each direct member's signature line,
/// dropping method bodies. Operates on raw source text since the extractor's
/// stored snippet is text, not a retained parse tree.
fn strip_class_to_signatures(snippet: &str) -> String {
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut skipping_body = false;

    for line in snippet.lines() {
        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;

        if skipping_body {
            depth += opens - closes;
            if depth <= 1 {
                skipping_body = false;
            }
            continue;
        }

        if depth <= 1 {
            out.push(line);
        }

        let before = depth;
        depth += opens - closes;
        if before <= 1 && depth > 1 {
            skipping_body = true;
        }
    }

    out.join("\n")
}

fn halve(text: &str) -> String {
    let target = text.chars().count() / 2;
    text.chars().take(target).collect()
}

async fn try_embed<B: InferenceBackend>(
    pool: &EmbeddingPool<B>,
    cache: &EmbeddingCache,
    document_prefix: Option<&str>,
    body: &str,
) -> Result<Option<EmbeddedContent>> {
    let final_text = match document_prefix {
        Some(prefix) => format!("{prefix}{body}"),
        None => body.to_string(),
    };
    let hash = content_hash(&final_text);

    if let Some(vector) = cache.get(&hash) {
        return Ok(Some(EmbeddedContent { vector, content_hash: hash }));
    }

    match pool.embed_document(&final_text, None).await {
        Ok(vector) => {
            cache.set(hash.clone(), vector.clone());
            Ok(Some(EmbeddedContent { vector, content_hash: hash }))
        }
        Err(e) if e.is_context_overflow() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Runs the ordered fallback pipeline for one node's snippet (spec §4.7 step
/// 3). `document_prefix` is the embedding preset's configured document
/// prefix, if any — applied once here, never by the pool (the pool would
/// otherwise double-apply it).
pub async fn embed_with_fallback<B: InferenceBackend>(
    pool: &EmbeddingPool<B>,
    cache: &EmbeddingCache,
    document_prefix: Option<&str>,
    node: &Node,
) -> Result<EmbeddedContent> {
    let type_label = node_type_label(node.node_type());

    // a. full prepared content.
    let full_body = prepare_document_content(type_label, &node.name, &node.file_path, &node.snippet, None);
    if let Some(result) = try_embed(pool, cache, document_prefix, &full_body).await? {
        return Ok(result);
    }
    let mut current = full_body;

    // b. class-signature-only rendering.
    if matches!(node.payload, NodePayload::Class(_)) {
        let stripped_snippet = strip_class_to_signatures(&node.snippet);
        let stripped_body = prepare_document_content(type_label, &node.name, &node.file_path, &stripped_snippet, None);
        if stripped_body != current {
            if let Some(result) = try_embed(pool, cache, document_prefix, &stripped_body).await? {
                return Ok(result);
            }
            current = stripped_body;
        }
    }

    // c. repeatedly halve down to the floor.
    loop {
        let halved = halve(&current);
        if halved.chars().count() < MIN_USEFUL_LEN {
            break;
        }
        if let Some(result) = try_embed(pool, cache, document_prefix, &halved).await? {
            return Ok(result);
        }
        current = halved;
    }

    // d. metadata-only.
    let metadata_body = format!("// {type_label}: {}\n// File: {}", node.name, node.file_path);
    match try_embed(pool, cache, document_prefix, &metadata_body).await? {
        Some(result) => Ok(result),
        None => Err(CodeGraphError::context_overflow(metadata_body.chars().count())),
    }
}
