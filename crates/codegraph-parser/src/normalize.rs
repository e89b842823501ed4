//! Type-text normalization and the fixed primitive / generic-wrapper type
//! sets used by edge extraction (spec §4.2.1, §4.2.2).

/// Primitive keyword types — descending into these for TAKES/RETURNS/
/// HAS_TYPE/HAS_PROPERTY edges is skipped.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "string", "number", "boolean", "null", "undefined", "void", "any", "unknown", "never",
    "object", "symbol", "bigint",
];

/// Union/intersection/array/generic-wrapper types that are descended into
/// rather than treated as opaque leaf types.
pub const GENERIC_WRAPPER_TYPES: &[&str] = &[
    "Array", "Map", "Set", "Promise", "Date", "RegExp", "Error", "Function", "Object", "String",
    "Number", "Boolean", "Symbol", "BigInt", "WeakMap", "WeakSet",
];

pub fn is_primitive_type(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

pub fn is_generic_wrapper(name: &str) -> bool {
    GENERIC_WRAPPER_TYPES.contains(&name)
}

/// Collapses newlines, tabs, and runs of whitespace to a single space, trims
/// the ends, and preserves the contents of string/template-literal spans
/// verbatim (spec §4.2.1).
pub fn normalize_type_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut last_was_space = false;

    for ch in raw.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == '\'' || ch == '"' || ch == '`' {
                    quote = Some(ch);
                    out.push(ch);
                    last_was_space = false;
                } else if ch.is_whitespace() {
                    if !last_was_space {
                        out.push(' ');
                        last_was_space = true;
                    }
                } else {
                    out.push(ch);
                    last_was_space = false;
                }
            }
        }
    }

    out.trim().to_string()
}

/// Extracts the bare type name from a possibly-generic type expression, e.g.
/// `Promise<User>` -> `Promise`, `User` -> `User`. Used to test membership in
/// the primitive / generic-wrapper sets and to key the type map.
pub fn base_type_name(type_text: &str) -> &str {
    type_text
        .split(|c: char| c == '<' || c == '[' || c == '|' || c == '&' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .unwrap_or(type_text)
}

/// For a generic wrapper like `Promise<User>` or `Array<User>`, returns the
/// inner type argument text, if any.
pub fn generic_argument(type_text: &str) -> Option<&str> {
    let start = type_text.find('<')?;
    let end = type_text.rfind('>')?;
    if end <= start + 1 {
        return None;
    }
    Some(type_text[start + 1..end].trim())
}
