// Weighted convex score fusion

use std::collections::HashMap;
use std::hash::Hash;

/// Combine vector and keyword results with a weighted sum.
///
/// Fusion Formula: fused(c) = vector(c) × w + keyword(c) × (1 − w)
///
/// Where:
/// - c is a chunk (or any key)
/// - vector(c) is its similarity score, 0 if absent from the vector results
/// - keyword(c) is the sum of its keyword scores, 0 if absent
/// - w is `vector_weight` in [0, 1]
///
/// A key present in only one list gets only that list's weighted
/// contribution. Keys repeated in `keyword_results` (one entry per keyword
/// searched) accumulate. Output is sorted by fused score descending; ties
/// keep first-seen order, vector results first.
pub fn weighted_fusion<T: Clone + Eq + Hash>(
    vector_results: &[(T, f32)],
    keyword_results: &[(T, f32)],
    vector_weight: f32,
) -> Vec<(T, f32)> {
    let keyword_weight = 1.0 - vector_weight;

    let mut order: Vec<(T, f32)> = Vec::new();
    let mut positions: HashMap<T, usize> = HashMap::new();

    let mut accumulate = |item: &T, contribution: f32| match positions.get(item) {
        Some(&pos) => order[pos].1 += contribution,
        None => {
            positions.insert(item.clone(), order.len());
            order.push((item.clone(), contribution));
        }
    };

    for (item, score) in vector_results {
        accumulate(item, score * vector_weight);
    }
    for (item, score) in keyword_results {
        accumulate(item, score * keyword_weight);
    }

    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fusion_weights() {
        let vector_results = vec![(1, 0.9), (2, 0.5)];
        let keyword_results = vec![(2, 1.0), (3, 0.4)];

        let fused = weighted_fusion(&vector_results, &keyword_results, 0.7);
        let scores: HashMap<i32, f32> = fused.iter().cloned().collect();

        assert!((scores[&1] - 0.63).abs() < 1e-6);
        assert!((scores[&2] - (0.35 + 0.3)).abs() < 1e-6);
        assert!((scores[&3] - 0.12).abs() < 1e-6);
        assert_eq!(fused[0].0, 2);
    }

    #[test]
    fn test_fusion_accumulates_repeated_keywords() {
        let vector_results: Vec<(i32, f32)> = vec![];
        let keyword_results = vec![(7, 0.2), (7, 0.3)];

        let fused = weighted_fusion(&vector_results, &keyword_results, 0.5);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_fusion_both_empty() {
        let a: Vec<(i32, f32)> = vec![];
        let b: Vec<(i32, f32)> = vec![];
        assert!(weighted_fusion(&a, &b, 0.7).is_empty());
    }

    #[test]
    fn test_fusion_vector_only_preserves_order() {
        let vector_results = vec![(1, 0.9), (2, 0.8), (3, 0.7)];
        let fused = weighted_fusion(&vector_results, &[], 0.7);
        let ids: Vec<i32> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_fusion_is_convex_in_weight() {
        // a: strong vector, weak keyword; b: weak vector, strong keyword
        let vector_results = vec![("a", 0.9), ("b", 0.3)];
        let keyword_results = vec![("a", 0.1), ("b", 0.8)];

        let mut previous_gap = f32::NEG_INFINITY;
        for step in 0..=10 {
            let w = step as f32 / 10.0;
            let fused: HashMap<&str, f32> = weighted_fusion(&vector_results, &keyword_results, w)
                .into_iter()
                .collect();
            let gap = fused["a"] - fused["b"];
            assert!(gap >= previous_gap - 1e-6, "gap shrank at w={}", w);
            previous_gap = gap;
        }
    }

    #[test]
    fn test_fusion_ties_keep_first_seen_order() {
        let vector_results = vec![(5, 0.5), (4, 0.5)];
        let fused = weighted_fusion(&vector_results, &[], 1.0);
        assert_eq!(fused[0].0, 5);
        assert_eq!(fused[1].0, 4);
    }
}
