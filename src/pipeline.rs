//! One-shot pipeline orchestration.
//!
//! A run walks the fixed stage order — comparison views, candidate
//! generation, scoring, id-level reduction, ground-truth reconciliation,
//! assessment, confusion sweep, calibration — over immutable snapshots.
//! Each stage produces a complete output table; there is no streaming or
//! incremental mode, and a failed stage aborts the whole run carrying
//! the stage name and the entity kind it was processing.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::calibrate::{self, PercentileRow};
use crate::candidates::{self, Retrieval};
use crate::config::{MatchConfig, Strategy};
use crate::error::{ExecutionError, MatchResult};
use crate::evaluate::{self, Assessment, ConfusionRow};
use crate::ground_truth::{self, CrossRefEntry, RealLinkSet, ReconcileStats, ReferentDecoder};
use crate::record::{EntityKind, RecordTable, SourceSide};
use crate::score::{self, ScoreMode, ScoredPair};

/// Wall-clock timing of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMeasure {
    /// Stage name.
    pub stage: String,
    /// Elapsed seconds.
    pub seconds: f64,
}

/// A real link the generator missed, with its direct similarity.
///
/// Computed after the fact for inspection: how close did the scorer get
/// on pairs that blocking or the neighborhood cut off before scoring?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedOutPair {
    /// Left entity id.
    pub id_left: String,
    /// Right entity id.
    pub id_right: String,
    /// Kind of the pair.
    pub kind: EntityKind,
    /// Best direct similarity over the pair's name variants.
    pub score: f32,
}

/// The terminal output of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Candidate-generation strategy evaluated.
    pub strategy: Strategy,
    /// Confusion matrix, one row per kind and threshold.
    pub confusion: Vec<ConfusionRow>,
    /// Percentile calibration over real links the generator found.
    pub calibration: Vec<PercentileRow>,
    /// Real links the generator missed, with direct similarities.
    pub blocked_out: Vec<BlockedOutPair>,
    /// Ground-truth reconciliation counts.
    pub reconcile: ReconcileStats,
    /// Per-stage wall-clock measures.
    pub measures: Vec<StageMeasure>,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
}

/// The configured matching pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: MatchConfig,
    left_decoder: ReferentDecoder,
    right_decoder: ReferentDecoder,
}

impl Pipeline {
    /// Builds a pipeline with the default referent decoders.
    ///
    /// # Errors
    ///
    /// Returns the first configuration [`ValidationError`]
    /// (as a [`crate::MatchError`]); a run never starts on an invalid
    /// configuration.
    ///
    /// [`ValidationError`]: crate::ValidationError
    pub fn new(config: MatchConfig) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            left_decoder: ReferentDecoder::left_default(),
            right_decoder: ReferentDecoder::right_default(),
        })
    }

    /// Replaces the per-source referent decoders.
    #[must_use]
    pub fn with_decoders(mut self, left: ReferentDecoder, right: ReferentDecoder) -> Self {
        self.left_decoder = left;
        self.right_decoder = right;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Runs the full evaluation over one snapshot and cross-reference feed.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] (as a [`crate::MatchError`]) with
    /// stage and kind context if candidate generation or scoring fails.
    pub fn run(&self, table: &RecordTable, crossref: &[CrossRefEntry]) -> MatchResult<RunReport> {
        let mut measures = Vec::new();

        let candidates = timed(&mut measures, "candidate generation and scoring", || {
            self.generate_scored(table)
        })?;

        let reduced = timed(&mut measures, "id-level reduction", || {
            Ok(score::reduce_to_ids(
                candidates,
                &table.id_kinds(SourceSide::Left),
            ))
        })?;

        let (links, reconcile) = timed(&mut measures, "ground-truth reconciliation", || {
            let (mut links, mut stats) =
                ground_truth::reconcile(crossref, &self.left_decoder, &self.right_decoder);
            links.retain_present(
                &table.ids(SourceSide::Left),
                &table.ids(SourceSide::Right),
                &mut stats,
            );
            links.retain_matching_kinds(
                &table.id_kinds(SourceSide::Left),
                &table.id_kinds(SourceSide::Right),
                &mut stats,
            );
            info!(
                links = links.len(),
                single_source = stats.single_source,
                multi_referent = stats.multi_referent,
                "ground truth reconciled"
            );
            Ok((links, stats))
        })?;

        let assessment = timed(&mut measures, "assessment", || {
            Ok(evaluate::build_assessment(
                &reduced,
                &links,
                &table.id_kinds(SourceSide::Left),
            ))
        })?;

        let confusion = timed(&mut measures, "confusion sweep", || {
            Ok(evaluate::confusion_sweep(
                &assessment,
                table,
                &self.config.thresholds,
            ))
        })?;

        let calibration = timed(&mut measures, "calibration", || {
            Ok(calibrate::calibration_from_assessment(&assessment))
        })?;

        let blocked_out = timed(&mut measures, "blocked-out inspection", || {
            Ok(self.blocked_out_pairs(table, &assessment))
        })?;

        Ok(RunReport {
            strategy: self.config.strategy,
            confusion,
            calibration,
            blocked_out,
            reconcile,
            measures,
            generated_at: Utc::now(),
        })
    }

    /// Generates scored candidate pairs for every kind, per the strategy.
    fn generate_scored(&self, table: &RecordTable) -> MatchResult<Vec<ScoredPair>> {
        let mut all = Vec::new();
        for kind in EntityKind::ALL {
            let span = info_span!("generate", strategy = ?self.config.strategy, kind = %kind);
            let _guard = span.enter();
            let pairs = match self.config.strategy {
                Strategy::Blocking => {
                    let candidates =
                        candidates::block_candidates(table, kind, &self.config.blocking);
                    score::score_string_candidates(table, &candidates)
                        .map_err(|e| stage_error("similarity scoring", kind, &e))?
                }
                Strategy::TopK => {
                    let k = *self.config.neighbors.k.get(kind);
                    candidates::neighbor_candidates(table, kind, Retrieval::TopK(k))
                        .map_err(|e| stage_error("neighbor search", kind, &e))?
                }
                Strategy::Radius => {
                    let radius = *self.config.neighbors.radius.get(kind);
                    candidates::neighbor_candidates(table, kind, Retrieval::Radius(radius))
                        .map_err(|e| stage_error("neighbor search", kind, &e))?
                }
            };
            info!(pairs = pairs.len(), "candidates scored");
            all.extend(pairs);
        }
        Ok(all)
    }

    /// Direct similarities of the real links the generator missed.
    #[must_use]
    pub fn blocked_out_pairs(
        &self,
        table: &RecordTable,
        assessment: &Assessment,
    ) -> Vec<BlockedOutPair> {
        let missed: RealLinkSet = assessment
            .blocked_out()
            .into_iter()
            .map(|row| ground_truth::RealLink {
                id_left: row.id_left.clone(),
                id_right: row.id_right.clone(),
            })
            .collect();
        let mode = if self.config.strategy.uses_embeddings() {
            ScoreMode::Embedding
        } else {
            ScoreMode::StringEnsemble
        };
        calibrate::score_real_pairs(table, &missed, mode)
            .into_iter()
            .map(|p| BlockedOutPair {
                id_left: p.id_left,
                id_right: p.id_right,
                kind: p.kind,
                score: p.score,
            })
            .collect()
    }
}

/// The real-pair calibration for this pipeline's score mode, bypassing
/// candidate generation entirely.
///
/// # Errors
///
/// Returns a validation error (as a [`crate::MatchError`]) if the
/// configuration is invalid.
pub fn real_pair_calibration(
    config: &MatchConfig,
    table: &RecordTable,
    crossref: &[CrossRefEntry],
) -> MatchResult<Vec<PercentileRow>> {
    config.validate()?;
    let (mut links, mut stats) = ground_truth::reconcile(
        crossref,
        &ReferentDecoder::left_default(),
        &ReferentDecoder::right_default(),
    );
    links.retain_present(
        &table.ids(SourceSide::Left),
        &table.ids(SourceSide::Right),
        &mut stats,
    );
    links.retain_matching_kinds(
        &table.id_kinds(SourceSide::Left),
        &table.id_kinds(SourceSide::Right),
        &mut stats,
    );
    let mode = if config.strategy.uses_embeddings() {
        ScoreMode::Embedding
    } else {
        ScoreMode::StringEnsemble
    };
    Ok(calibrate::real_pair_calibration(table, &links, mode))
}

fn stage_error(
    stage: &str,
    kind: EntityKind,
    cause: &dyn std::fmt::Display,
) -> crate::error::MatchError {
    ExecutionError::StageFailed {
        stage: stage.to_string(),
        kind: kind.to_string(),
        message: cause.to_string(),
    }
    .into()
}

/// Runs a closure as a named, timed stage.
fn timed<T>(
    measures: &mut Vec<StageMeasure>,
    stage: &str,
    f: impl FnOnce() -> MatchResult<T>,
) -> MatchResult<T> {
    let span = info_span!("stage", stage);
    let _guard = span.enter();
    let start = Instant::now();
    let result = f()?;
    let seconds = start.elapsed().as_secs_f64();
    info!(seconds, "stage finished");
    measures.push(StageMeasure {
        stage: stage.to_string(),
        seconds,
    });
    Ok(result)
}
