//! Brute-force cosine similarity search.
//!
//! Every eligible record is scored on each query. Knowledge bases here hold
//! thousands of chunks at most, where a linear scan beats maintaining an
//! index.

use crate::store::DocumentRecord;

/// One ranked search result borrowed from the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub record: &'a DocumentRecord,
    pub similarity: f32,
    /// 1-based position in the ranking
    pub rank: usize,
}

/// Calculate cosine similarity between two vectors.
///
/// Returns 0.0 when either norm is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity as f32
    } else {
        0.0
    }
}

/// Rank `records` against `query` and keep the best `top_k`.
///
/// Records without an embedding are skipped. A record whose vector length
/// differs from the query scores 0.0 instead of failing the search. The sort
/// is stable, so equal scores keep insertion order.
pub fn rank<'a>(records: &'a [DocumentRecord], query: &[f32], top_k: usize) -> Vec<SearchHit<'a>> {
    if top_k == 0 {
        return Vec::new();
    }

    let mut mismatched = 0usize;
    let mut scored: Vec<(&DocumentRecord, f32)> = records
        .iter()
        .filter_map(|record| {
            let embedding = record.embedding.as_deref()?;
            if embedding.len() != query.len() {
                mismatched += 1;
            }
            Some((record, cosine_similarity(query, embedding)))
        })
        .collect();

    if mismatched > 0 {
        tracing::warn!(
            "{} record(s) have a different embedding length than the query ({}); scored as 0.0",
            mismatched,
            query.len()
        );
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    tracing::debug!(
        "Ranked {} of {} records (requested top-{})",
        scored.len(),
        records.len(),
        top_k
    );

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (record, similarity))| SearchHit {
            record,
            similarity,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, embedding: Option<Vec<f32>>) -> DocumentRecord {
        DocumentRecord::new(text, "doc.txt", 0).with_embedding(embedding)
    }

    #[test]
    fn test_cosine_identical() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_sorted_and_bounded() {
        let records = vec![
            record("a", Some(vec![0.2, 0.8])),
            record("b", Some(vec![0.9, 0.1])),
            record("c", Some(vec![0.5, 0.5])),
            record("d", Some(vec![1.0, 0.0])),
        ];

        let hits = rank(&records, &[1.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].record.text, "d");
        assert_eq!(hits[0].rank, 1);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_rank_skips_records_without_embedding() {
        let records = vec![record("a", None), record("b", Some(vec![1.0, 0.0])), record("c", None)];

        let hits = rank(&records, &[1.0, 0.0], 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.text, "b");
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let records = vec![
            record("first", Some(vec![1.0, 1.0])),
            record("second", Some(vec![2.0, 2.0])),
            record("third", Some(vec![3.0, 3.0])),
        ];

        let hits = rank(&records, &[1.0, 1.0], 3);
        let order: Vec<&str> = hits.iter().map(|h| h.record.text.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_mismatched_dimension_scores_zero() {
        let records = vec![
            record("short", Some(vec![1.0])),
            record("match", Some(vec![0.6, 0.8])),
        ];

        let hits = rank(&records, &[1.0, 0.0], 2);
        assert_eq!(hits[0].record.text, "match");
        assert_eq!(hits[1].similarity, 0.0);
    }

    #[test]
    fn test_rank_zero_top_k_and_empty_store() {
        let records = vec![record("a", Some(vec![1.0, 0.0]))];
        assert!(rank(&records, &[1.0, 0.0], 0).is_empty());
        assert!(rank(&[], &[1.0, 0.0], 5).is_empty());
    }
}
