//! Hybrid score combiner (spec §4.5): blends a normalized BM25 score with
//! cosine similarity, compressing BM25's long tail with a fractional power so
//! neither signal can dominate just by having a larger raw scale.

pub const BM25_WEIGHT: f32 = 0.5;
pub const VECTOR_WEIGHT: f32 = 0.5;
pub const BM25_COMPRESSION: f32 = 0.3;

/// `max_bm25` is the maximum raw BM25 score across the current candidate
/// set (after filters, before ranking) — not a global constant. When it is
/// zero (no term matched in this set), the result is half the similarity
/// score, not zero.
pub fn combine_scores(bm25: f32, max_bm25: f32, cosine_similarity: f32) -> f32 {
    if max_bm25 == 0.0 {
        cosine_similarity * VECTOR_WEIGHT
    } else {
        (bm25 / max_bm25).powf(BM25_COMPRESSION) * BM25_WEIGHT + cosine_similarity * VECTOR_WEIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_bm25_falls_back_to_half_similarity() {
        assert_eq!(combine_scores(0.0, 0.0, 0.8), 0.4);
    }

    #[test]
    fn full_bm25_and_full_similarity_sum_to_one() {
        let score = combine_scores(5.0, 5.0, 1.0);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn compression_favors_partial_bm25_matches() {
        let half = combine_scores(2.5, 5.0, 0.0);
        assert!(half > 0.25, "compression should lift partial matches above linear scaling: {half}");
    }
}
