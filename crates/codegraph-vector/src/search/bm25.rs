//! Single-field BM25 (Okapi) index (spec §4.5): simplified from the
//! teacher's field-weighted design down to the one field the spec scores
//! over (`symbol` and `content` tokenized together into one bag of words),
//! keeping the tokenization and scoring shape.

use std::collections::HashMap;

#[derive(Copy, Clone, Debug)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

#[derive(Clone, Debug)]
struct Posting {
    doc_id: usize,
    term_freq: u32,
}

#[derive(Default)]
pub struct Bm25Index {
    inv: HashMap<String, Vec<Posting>>,
    doc_len: Vec<u32>,
    avg_doc_len: f32,
    df: HashMap<String, u32>,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes on non-alphanumeric (keeping `_`), then splits each token on
    /// camelCase boundaries, lowercasing everything — the full identifier is
    /// also kept as a token so exact-identifier queries still match.
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .filter(|s| !s.is_empty())
            .flat_map(split_camel_case)
            .map(|s| s.to_ascii_lowercase())
            .collect()
    }

    /// `doc_id` must be assigned densely starting at 0 by the caller (the
    /// containing [`crate::search::index::HybridIndex`]) so it can index
    /// straight into `doc_len`.
    pub fn add_document(&mut self, doc_id: usize, text: &str) {
        let tokens = Self::tokenize(text);
        if doc_id >= self.doc_len.len() {
            self.doc_len.resize(doc_id + 1, 0);
        }
        self.doc_len[doc_id] = tokens.len() as u32;

        for term in &tokens {
            let postings = self.inv.entry(term.clone()).or_default();
            match postings.iter_mut().find(|p| p.doc_id == doc_id) {
                Some(p) => p.term_freq += 1,
                None => postings.push(Posting { doc_id, term_freq: 1 }),
            }
        }
    }

    pub fn finalize(&mut self) {
        let n_docs = self.doc_len.len().max(1) as f32;
        self.avg_doc_len = self.doc_len.iter().sum::<u32>() as f32 / n_docs;
        self.df.clear();
        for (term, postings) in &self.inv {
            self.df.insert(term.clone(), postings.len() as u32);
        }
    }

    /// Raw BM25 scores keyed by `doc_id`, unnormalized. Callers (the hybrid
    /// combiner) divide by the max score across the candidate set themselves
    /// (spec §4.5).
    pub fn score(&self, query: &str, params: Bm25Params) -> HashMap<usize, f32> {
        let mut scores: HashMap<usize, f32> = HashMap::new();
        let n_docs = self.doc_len.len().max(1) as f32;

        for term in Self::tokenize(query) {
            let Some(postings) = self.inv.get(&term) else {
                continue;
            };
            let df = *self.df.get(&term).unwrap_or(&1) as f32;
            let idf = ((n_docs - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                let len = self.doc_len[posting.doc_id] as f32;
                let norm = 1.0 - params.b + params.b * (len / self.avg_doc_len.max(1e-6));
                let tf = posting.term_freq as f32;
                let denom = tf + params.k1 * norm;
                let term_score = idf * (tf * (params.k1 + 1.0)) / denom.max(1e-6);
                *scores.entry(posting.doc_id).or_default() += term_score;
            }
        }
        scores
    }
}

fn split_camel_case(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut tokens = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;

    for i in 1..bytes.len() {
        let prev = bytes[i - 1] as char;
        let curr = bytes[i] as char;
        let boundary = curr == '_' || (prev.is_ascii_lowercase() && curr.is_ascii_uppercase());
        if boundary {
            if start < i && bytes[start] != b'_' {
                tokens.push(&s[start..i]);
            }
            start = if curr == '_' { i + 1 } else { i };
        }
    }
    if start < s.len() && bytes[start] != b'_' {
        tokens.push(&s[start..]);
    }
    if tokens.len() > 1 {
        tokens.push(s);
    }
    tokens
}
