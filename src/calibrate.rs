//! Score-distribution calibration over known true matches.
//!
//! Picking an operating threshold means asking: which cutoff keeps, say,
//! 95% of true matches? The answer is the empirical percentile table of
//! similarity scores restricted to real links, with linear interpolation
//! between order statistics and the cumulative count of real pairs at or
//! below each percentile.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::evaluate::Assessment;
use crate::ground_truth::RealLinkSet;
use crate::record::{EntityKind, RecordTable, SourceSide};
use crate::score::{self, ScoreMode, ScoredPair};

/// One row of the calibration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileRow {
    /// Percentile, 0 through 100 in integer steps.
    pub percentile: u8,
    /// Interpolated score at the percentile.
    pub score: f32,
    /// Real pairs with score at or below this percentile,
    /// `round(percentile/100 * n)`.
    pub cumulative_real_pairs: u64,
}

/// The empirical percentile distribution of a score sample.
///
/// Returns an empty table for an empty sample (a generator that found no
/// real pairs is representable, not an error).
#[must_use]
pub fn percentile_table(scores: &[f32]) -> Vec<PercentileRow> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f32::total_cmp);
    let n = sorted.len();
    (0..=100u8)
        .map(|percentile| {
            let q = f64::from(percentile) / 100.0;
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let cumulative_real_pairs = (q * n as f64).round() as u64;
            PercentileRow {
                percentile,
                score: interpolate(&sorted, q),
                cumulative_real_pairs,
            }
        })
        .collect()
}

/// Linear interpolation between order statistics at quantile `q`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn interpolate(sorted: &[f32], q: f64) -> f32 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = (position - lower as f64) as f32;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Calibration over the real links the candidate generator found.
#[must_use]
pub fn calibration_from_assessment(assessment: &Assessment) -> Vec<PercentileRow> {
    percentile_table(&assessment.found_real_scores())
}

/// Scores every real link directly, bypassing candidate generation.
///
/// For each link, all surviving name-variant combinations of the two ids
/// are scored and reduced to the maximum, exactly as candidate pairs
/// would be. This measures what the scorer alone can achieve on known
/// true matches, independent of blocking or neighborhood recall. Links
/// whose ids have no comparable variants contribute nothing.
#[must_use]
pub fn score_real_pairs(
    table: &RecordTable,
    links: &RealLinkSet,
    mode: ScoreMode,
) -> Vec<ScoredPair> {
    let mut left_variants: HashMap<&str, Vec<&crate::record::EntityRecord>> = HashMap::new();
    let mut right_variants: HashMap<&str, Vec<&crate::record::EntityRecord>> = HashMap::new();
    for kind in EntityKind::ALL {
        for record in table.comparison_view(kind, false) {
            match record.source {
                SourceSide::Left => left_variants.entry(record.id.as_str()).or_default().push(record),
                SourceSide::Right => {
                    right_variants.entry(record.id.as_str()).or_default().push(record);
                }
            }
        }
    }
    let mut pairs = Vec::new();
    for link in links.iter() {
        let (Some(lefts), Some(rights)) = (
            left_variants.get(link.id_left.as_str()),
            right_variants.get(link.id_right.as_str()),
        ) else {
            continue;
        };
        for left in lefts {
            for right in rights {
                let score = match mode {
                    ScoreMode::StringEnsemble => {
                        score::string_ensemble(&left.name_norm, &right.name_norm)
                    }
                    ScoreMode::Embedding => match (&left.embedding, &right.embedding) {
                        (Some(a), Some(b)) => score::dot_product(a, b),
                        _ => continue,
                    },
                };
                pairs.push(ScoredPair {
                    id_left: left.id.clone(),
                    id_right: right.id.clone(),
                    idx_left: left.idx.clone(),
                    idx_right: right.idx.clone(),
                    kind: left.kind,
                    score,
                });
            }
        }
    }
    score::reduce_to_ids(pairs, &table.id_kinds(SourceSide::Left))
}

/// The real-pair calibration table: direct scores of all true matches.
#[must_use]
pub fn real_pair_calibration(
    table: &RecordTable,
    links: &RealLinkSet,
    mode: ScoreMode,
) -> Vec<PercentileRow> {
    let scores: Vec<f32> = score_real_pairs(table, links, mode)
        .iter()
        .map(|p| p.score)
        .collect();
    percentile_table(&scores)
}
