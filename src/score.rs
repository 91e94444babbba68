//! Similarity scoring and reduction from name variants to entity pairs.
//!
//! String mode scores a candidate pair as the maximum of two metrics over
//! the normalized names (Jaro-Winkler and bigram cosine) — the maximum,
//! not the average, so one high-confidence method carries the pair.
//! Embedding mode scores the inner product of two pre-normalized vectors.
//! Scoring is a pure per-pair function, so pairs are scored in parallel.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::candidates::CandidatePair;
use crate::error::ExecutionError;
use crate::record::{EntityKind, EntityRecord, RecordTable};

/// Which similarity function scores candidate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Max of Jaro-Winkler and bigram cosine over `name_norm`.
    StringEnsemble,
    /// Inner product of unit-norm embeddings.
    Embedding,
}

/// A scored candidate pair at name-variant granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    /// Left entity id.
    pub id_left: String,
    /// Right entity id.
    pub id_right: String,
    /// Left name-variant key.
    pub idx_left: String,
    /// Right name-variant key.
    pub idx_right: String,
    /// Entity kind of the pair.
    pub kind: EntityKind,
    /// Similarity score.
    pub score: f32,
}

/// Jaro-Winkler similarity in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn jaro_winkler_sim(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(a, b) as f32
}

/// Cosine similarity of character-bigram count profiles in `[0, 1]`.
///
/// Names are padded with one leading and trailing space so that first and
/// last characters contribute positional bigrams, matching the q-gram
/// convention of the string-comparison literature.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn bigram_cosine_sim(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let pa = bigram_profile(a);
    let pb = bigram_profile(b);
    let mut dot = 0.0f64;
    for (gram, &ca) in &pa {
        if let Some(&cb) = pb.get(gram) {
            dot += f64::from(ca) * f64::from(cb);
        }
    }
    let norm_a: f64 = pa.values().map(|&c| f64::from(c) * f64::from(c)).sum();
    let norm_b: f64 = pb.values().map(|&c| f64::from(c) * f64::from(c)).sum();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

fn bigram_profile(s: &str) -> HashMap<(char, char), u32> {
    let padded: Vec<char> = std::iter::once(' ')
        .chain(s.chars())
        .chain(std::iter::once(' '))
        .collect();
    let mut profile = HashMap::new();
    for window in padded.windows(2) {
        *profile.entry((window[0], window[1])).or_insert(0u32) += 1;
    }
    profile
}

/// The string-ensemble score: max of the individual metrics.
#[must_use]
pub fn string_ensemble(a: &str, b: &str) -> f32 {
    jaro_winkler_sim(a, b).max(bigram_cosine_sim(a, b))
}

/// Inner product of two vectors (cosine similarity for unit-norm inputs).
///
/// Returns 0 for mismatched lengths; dimension agreement is enforced when
/// the neighbor index is built, so a mismatch here means the pair was
/// filtered out upstream.
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scores blocking candidates with the string ensemble, in parallel.
///
/// # Errors
///
/// Returns [`ExecutionError::UnknownRecordIdx`] if a candidate references
/// a variant key absent from the snapshot; candidates are derived from
/// the same snapshot, so this indicates caller misuse.
pub fn score_string_candidates(
    table: &RecordTable,
    candidates: &[CandidatePair],
) -> Result<Vec<ScoredPair>, ExecutionError> {
    let by_idx: HashMap<&str, &EntityRecord> = table
        .records()
        .iter()
        .map(|r| (r.idx.as_str(), r))
        .collect();
    candidates
        .par_iter()
        .map(|pair| {
            let left = lookup(&by_idx, &pair.idx_left)?;
            let right = lookup(&by_idx, &pair.idx_right)?;
            Ok(ScoredPair {
                id_left: left.id.clone(),
                id_right: right.id.clone(),
                idx_left: pair.idx_left.clone(),
                idx_right: pair.idx_right.clone(),
                kind: pair.kind,
                score: string_ensemble(&left.name_norm, &right.name_norm),
            })
        })
        .collect()
}

fn lookup<'a>(
    by_idx: &HashMap<&str, &'a EntityRecord>,
    idx: &str,
) -> Result<&'a EntityRecord, ExecutionError> {
    by_idx.get(idx).copied().ok_or_else(|| ExecutionError::UnknownRecordIdx {
        idx: idx.to_string(),
    })
}

/// Reduces variant-level pairs to one row per `(id_left, id_right)`.
///
/// Keeps the maximum score among all variant combinations of an id pair;
/// ties break deterministically on `(idx_left, idx_right)` via a stable
/// sort. The pair's kind is re-assigned from the id-to-kind map so that
/// kind is a function of the id, not of the winning variant row.
/// Evaluating without this reduction would double-count entities with
/// many name variants.
#[must_use]
pub fn reduce_to_ids(
    mut pairs: Vec<ScoredPair>,
    kinds: &HashMap<String, EntityKind>,
) -> Vec<ScoredPair> {
    pairs.sort_by(|a, b| {
        (&a.id_left, &a.id_right)
            .cmp(&(&b.id_left, &b.id_right))
            .then(b.score.total_cmp(&a.score))
            .then_with(|| (&a.idx_left, &a.idx_right).cmp(&(&b.idx_left, &b.idx_right)))
    });
    pairs.dedup_by(|b, a| a.id_left == b.id_left && a.id_right == b.id_right);
    for pair in &mut pairs {
        if let Some(kind) = kinds.get(&pair.id_left) {
            pair.kind = *kind;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceSide;

    fn scored(id_left: &str, id_right: &str, ord_l: u32, ord_r: u32, score: f32) -> ScoredPair {
        ScoredPair {
            id_left: id_left.to_string(),
            id_right: id_right.to_string(),
            idx_left: EntityRecord::idx_of(id_left, ord_l),
            idx_right: EntityRecord::idx_of(id_right, ord_r),
            kind: EntityKind::Individual,
            score,
        }
    }

    #[test]
    fn test_jaro_winkler_bounds() {
        assert!((jaro_winkler_sim("acme", "acme") - 1.0).abs() < 1e-6);
        assert_eq!(jaro_winkler_sim("", "acme"), 0.0);
        let s = jaro_winkler_sim("acme", "acne");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_bigram_cosine_identical() {
        assert!((bigram_cosine_sim("acme", "acme") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bigram_cosine_disjoint() {
        // No shared bigrams at all.
        assert_eq!(bigram_cosine_sim("xq", "zv"), 0.0);
    }

    #[test]
    fn test_bigram_cosine_word_order_insensitive_profiles() {
        // Bigram profiles overlap heavily under token reordering.
        let s = bigram_cosine_sim("anna maria", "maria anna");
        assert!(s > 0.8);
    }

    #[test]
    fn test_ensemble_is_max() {
        let a = "anna maria";
        let b = "maria anna";
        let ensemble = string_ensemble(a, b);
        assert!((ensemble - jaro_winkler_sim(a, b).max(bigram_cosine_sim(a, b))).abs() < 1e-6);
        assert!(ensemble >= bigram_cosine_sim(a, b));
    }

    #[test]
    fn test_ensemble_empty_name_scores_zero() {
        assert_eq!(string_ensemble("", "acme"), 0.0);
        assert_eq!(string_ensemble("acme", ""), 0.0);
    }

    #[test]
    fn test_dot_product_unit_vectors() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert_eq!(dot_product(&a, &a), 1.0);
        assert_eq!(dot_product(&a, &b), 0.0);
        assert_eq!(dot_product(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_score_string_candidates() {
        let mut left = EntityRecord::new(SourceSide::Left, "L1", 0, EntityKind::Individual, "Anna");
        left.name_norm = "anna".to_string();
        let mut right = EntityRecord::new(SourceSide::Right, "R1", 0, EntityKind::Individual, "Anna");
        right.name_norm = "anna".to_string();
        let table = RecordTable::new(vec![left, right]);
        let candidates = vec![CandidatePair {
            idx_left: "L1-0".to_string(),
            idx_right: "R1-0".to_string(),
            kind: EntityKind::Individual,
        }];
        let scored = score_string_candidates(&table, &candidates).unwrap();
        assert_eq!(scored.len(), 1);
        assert!((scored[0].score - 1.0).abs() < 1e-6);
        assert_eq!(scored[0].id_left, "L1");
        assert_eq!(scored[0].id_right, "R1");
    }

    #[test]
    fn test_score_unknown_idx_fails() {
        let table = RecordTable::new(vec![]);
        let candidates = vec![CandidatePair {
            idx_left: "L1-0".to_string(),
            idx_right: "R1-0".to_string(),
            kind: EntityKind::Individual,
        }];
        assert!(score_string_candidates(&table, &candidates).is_err());
    }

    #[test]
    fn test_reduce_keeps_max_per_id_pair() {
        let pairs = vec![
            scored("L1", "R1", 0, 0, 0.70),
            scored("L1", "R1", 1, 0, 0.95),
            scored("L1", "R2", 0, 0, 0.80),
        ];
        let reduced = reduce_to_ids(pairs, &HashMap::new());
        assert_eq!(reduced.len(), 2);
        let r1 = reduced.iter().find(|p| p.id_right == "R1").unwrap();
        assert!((r1.score - 0.95).abs() < 1e-6);
        assert_eq!(r1.idx_left, "L1-1");
    }

    #[test]
    fn test_reduce_tie_break_is_deterministic() {
        let pairs = vec![
            scored("L1", "R1", 2, 0, 0.90),
            scored("L1", "R1", 1, 0, 0.90),
        ];
        let reduced = reduce_to_ids(pairs, &HashMap::new());
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].idx_left, "L1-1");
    }

    #[test]
    fn test_reduce_assigns_kind_from_id_map() {
        let pairs = vec![scored("L1", "R1", 0, 0, 0.9)];
        let mut kinds = HashMap::new();
        kinds.insert("L1".to_string(), EntityKind::Organization);
        let reduced = reduce_to_ids(pairs, &kinds);
        assert_eq!(reduced[0].kind, EntityKind::Organization);
    }
}
