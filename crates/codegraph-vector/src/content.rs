//! Document text preparation (spec §4.3, §4.7 step 2): the exact textual
//! form that gets embedded, independent of whichever model backend does the
//! embedding.

/// `// {node_type}: {name}\n// File: {file_path}\n\n{snippet}`, with an
/// optional prefix prepended before the comment header (spec §4.3).
pub fn prepare_document_content(
    node_type: &str,
    name: &str,
    file_path: &str,
    snippet: &str,
    prefix: Option<&str>,
) -> String {
    let body = format!("// {node_type}: {name}\n// File: {file_path}\n\n{snippet}");
    match prefix {
        Some(p) => format!("{p}{body}"),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_header_then_snippet() {
        let doc = prepare_document_content("function", "doThing", "src/a.ts", "function doThing() {}", None);
        assert_eq!(doc, "// function: doThing\n// File: src/a.ts\n\nfunction doThing() {}");
    }

    #[test]
    fn prefix_precedes_the_header() {
        let doc = prepare_document_content("function", "doThing", "src/a.ts", "function doThing() {}", Some("search_document: "));
        assert!(doc.starts_with("search_document: // function: doThing"));
    }
}
