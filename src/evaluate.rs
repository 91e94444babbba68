//! Confusion-matrix evaluation of scored candidates against real links.
//!
//! The central design decision is the split false-negative accounting:
//! a true match the generator never proposed is `fn_block` (constant
//! across thresholds — only a different blocking key or neighbor count
//! can recover it), while a proposed pair scoring below the threshold is
//! `fn_threshold` (recoverable by lowering the cutoff). A merged count
//! would hide which lever to pull.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ground_truth::RealLinkSet;
use crate::record::{EntityKind, RecordTable};
use crate::score::ScoredPair;

/// One id-level pair in the evaluation universe that was either proposed
/// by the generator, asserted real, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRow {
    /// Left entity id.
    pub id_left: String,
    /// Right entity id.
    pub id_right: String,
    /// Kind of the pair (a function of the left id).
    pub kind: EntityKind,
    /// Maximum similarity over the pair's variants; 0 for pairs the
    /// generator never produced.
    pub score: f32,
    /// True if the pair is an asserted real link.
    pub real: bool,
    /// True if the generator proposed the pair.
    pub in_block: bool,
}

/// The outer join of id-level candidates with real links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    rows: Vec<AssessmentRow>,
}

impl Assessment {
    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[AssessmentRow] {
        &self.rows
    }

    /// The real links the generator never proposed (lost to blocking or
    /// neighborhood recall, before any threshold applies).
    #[must_use]
    pub fn blocked_out(&self) -> Vec<&AssessmentRow> {
        self.rows.iter().filter(|r| r.real && !r.in_block).collect()
    }

    /// Scores of real links the generator did find (calibration input).
    #[must_use]
    pub fn found_real_scores(&self) -> Vec<f32> {
        self.rows
            .iter()
            .filter(|r| r.real && r.in_block)
            .map(|r| r.score)
            .collect()
    }
}

/// Joins id-level candidates with real links into an [`Assessment`].
///
/// `candidates` must already be reduced to id granularity (one row per
/// id pair, maximum score). Pairs in both sets keep their score; real
/// links absent from the candidates enter with `in_block = false` and
/// score 0. Kind comes from the left-side id-to-kind map; links whose
/// left id is not in the map are skipped with a debug log (they cannot
/// be attributed to a stratum).
#[must_use]
pub fn build_assessment(
    candidates: &[ScoredPair],
    links: &RealLinkSet,
    kinds: &HashMap<String, EntityKind>,
) -> Assessment {
    let link_set: HashSet<(&str, &str)> = links
        .iter()
        .map(|l| (l.id_left.as_str(), l.id_right.as_str()))
        .collect();
    let mut rows = Vec::with_capacity(candidates.len());
    let mut proposed: HashSet<(&str, &str)> = HashSet::with_capacity(candidates.len());
    for pair in candidates {
        proposed.insert((pair.id_left.as_str(), pair.id_right.as_str()));
        rows.push(AssessmentRow {
            id_left: pair.id_left.clone(),
            id_right: pair.id_right.clone(),
            kind: pair.kind,
            score: pair.score,
            real: link_set.contains(&(pair.id_left.as_str(), pair.id_right.as_str())),
            in_block: true,
        });
    }
    for link in links.iter() {
        if proposed.contains(&(link.id_left.as_str(), link.id_right.as_str())) {
            continue;
        }
        let Some(kind) = kinds.get(&link.id_left) else {
            debug!(id_left = %link.id_left, "real link has no kind in snapshot; skipping");
            continue;
        };
        rows.push(AssessmentRow {
            id_left: link.id_left.clone(),
            id_right: link.id_right.clone(),
            kind: *kind,
            score: 0.0,
            real: true,
            in_block: false,
        });
    }
    Assessment { rows }
}

/// One confusion-matrix row for a (kind, threshold) stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionRow {
    /// Entity kind of the stratum.
    pub kind: EntityKind,
    /// Decision threshold.
    pub threshold: f32,
    /// Proposed, real, score at or above threshold.
    pub tp: u64,
    /// Proposed, not real, score at or above threshold.
    pub fp: u64,
    /// Proposed, real, score below threshold.
    pub fn_threshold: u64,
    /// Real but never proposed; constant across thresholds.
    pub fn_block: u64,
    /// `fn_threshold + fn_block`.
    pub fn_total: u64,
    /// Remainder of the id cross-product universe.
    pub tn: u64,
    /// `tp / (tp + fp)`, 0 when undefined.
    pub precision: f64,
    /// `tp / (tp + fn_total)`, 0 when undefined.
    pub recall: f64,
    /// `(tp + tn) / universe`, 0 when undefined.
    pub accuracy: f64,
    /// Harmonic mean of precision and recall, 0 when undefined.
    pub f1: f64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Classifies one (kind, threshold) stratum.
///
/// `universe` is the distinct-id count per side for the kind; the counts
/// partition the full `left * right` cross-product exactly:
/// `tp + fp + fn_total + tn == left * right`.
#[must_use]
pub fn confusion_row(
    assessment: &Assessment,
    kind: EntityKind,
    threshold: f32,
    universe: (u64, u64),
) -> ConfusionRow {
    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut fn_threshold = 0u64;
    let mut fn_block = 0u64;
    for row in assessment.rows() {
        if row.kind != kind {
            continue;
        }
        match (row.in_block, row.real, row.score >= threshold) {
            (true, true, true) => tp += 1,
            (true, false, true) => fp += 1,
            (true, true, false) => fn_threshold += 1,
            (false, true, _) => fn_block += 1,
            _ => {}
        }
    }
    let fn_total = fn_threshold + fn_block;
    let total = universe.0 * universe.1;
    // Cross-kind links are filtered during reconciliation; saturate so a
    // malformed assessment can never wrap `tn` past the universe.
    let tn = total.saturating_sub(tp + fp + fn_total);
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_total);
    let accuracy = ratio(tp + tn, total);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ConfusionRow {
        kind,
        threshold,
        tp,
        fp,
        fn_threshold,
        fn_block,
        fn_total,
        tn,
        precision,
        recall,
        accuracy,
        f1,
    }
}

/// Sweeps every kind and threshold over one assessment.
#[must_use]
pub fn confusion_sweep(
    assessment: &Assessment,
    table: &RecordTable,
    thresholds: &[f32],
) -> Vec<ConfusionRow> {
    let mut out = Vec::with_capacity(EntityKind::ALL.len() * thresholds.len());
    for kind in EntityKind::ALL {
        let universe = table.universe(kind);
        for &threshold in thresholds {
            out.push(confusion_row(assessment, kind, threshold, universe));
        }
    }
    out
}
