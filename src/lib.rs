//! # sanmatch - Sanctions-list record linkage and evaluation
//!
//! sanmatch matches entity records describing the same real-world person
//! or organization across two independently maintained sanctions lists,
//! and evaluates candidate matching strategies against externally
//! supplied ground truth.
//!
//! ## Core Concepts
//!
//! - **EntityRecord**: one name variant of one listed entity; several
//!   variants share an entity id
//! - **Candidate pair**: a left/right variant combination selected for
//!   similarity scoring, by exact-key blocking or embedding neighbor
//!   search
//! - **RealLink**: an externally asserted true correspondence between a
//!   left and a right entity id
//! - **ConfusionRow**: per-kind, per-threshold classification separating
//!   threshold misses from pairs the generator never proposed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sanmatch::{MatchConfig, Pipeline, RecordTable};
//!
//! let pipeline = Pipeline::new(MatchConfig::default())?;
//! let report = pipeline.run(&table, &crossref_feed)?;
//! for row in &report.confusion {
//!     println!("{:?} @ {:.2}: recall {:.3}", row.kind, row.threshold, row.recall);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calibrate;
pub mod candidates;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod ground_truth;
pub mod legal_forms;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod score;

// Re-export primary types at crate root for convenience
pub use calibrate::{percentile_table, PercentileRow};
pub use candidates::{block_candidates, neighbor_candidates, CandidatePair, NeighborIndex, Retrieval};
pub use config::{BlockAttribute, BlockingConfig, MatchConfig, NeighborConfig, PerKind, Strategy};
pub use error::{ExecutionError, MatchError, MatchResult, ValidationError};
pub use evaluate::{build_assessment, confusion_sweep, Assessment, AssessmentRow, ConfusionRow};
pub use ground_truth::{
    reconcile, CrossRefEntry, RealLink, RealLinkSet, ReconcileStats, ReferentDecoder,
};
pub use normalize::{normalize_city, normalize_name, LegalFormStripper};
pub use pipeline::{BlockedOutPair, Pipeline, RunReport, StageMeasure};
pub use record::{EntityKind, EntityRecord, RecordTable, SnapshotStat, SourceSide};
pub use score::{reduce_to_ids, string_ensemble, ScoreMode, ScoredPair};
