//! Error types for sanmatch.
//!
//! All errors are strongly typed using thiserror. Configuration problems
//! fail a run immediately; data-quality conditions (missing names, missing
//! blocking keys, stale ground-truth references) are never errors and are
//! filtered locally by the stage that encounters them.

use thiserror::Error;

/// Validation errors raised while checking a run configuration.
///
/// Silently defaulting any of these would corrupt the evaluation metrics,
/// so they abort the run before any stage executes.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Unknown entity kind code '{code}' (expected 'I' or 'O')")]
    UnknownEntityKind {
        code: String,
    },

    #[error("Threshold sweep is empty")]
    EmptyThresholdSweep,

    #[error("Threshold {value} is out of range [0.0, 1.0]")]
    ThresholdOutOfRange {
        value: f32,
    },

    #[error("Threshold sweep is not monotonically increasing: {prev} precedes {next}")]
    NonIncreasingThresholds {
        prev: f32,
        next: f32,
    },

    #[error("Neighbor count for {kind} entities must be greater than 0")]
    InvalidNeighborCount {
        kind: String,
    },

    #[error("Similarity radius {value} for {kind} entities is out of range [-1.0, 1.0]")]
    RadiusOutOfRange {
        kind: String,
        value: f32,
    },

    #[error("Blocking key list for {kind} entities is empty")]
    EmptyBlockingKeys {
        kind: String,
    },

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    InvalidEmbeddingDimension {
        actual: usize,
        expected: usize,
    },

    #[error("Legal-form pattern table is empty")]
    EmptyPatternTable,

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("Referent pattern '{pattern}' must contain one capture group")]
    MissingReferentCapture {
        pattern: String,
    },
}

/// Execution errors raised while a pipeline stage is running.
///
/// The pipeline is a one-shot batch computation: a failed stage surfaces
/// here with the stage name and the entity kind being processed, and the
/// whole run aborts. There are no retries.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Stage '{stage}' failed for {kind} entities: {message}")]
    StageFailed {
        stage: String,
        kind: String,
        message: String,
    },

    #[error("Record idx '{idx}' referenced by a candidate pair is not in the snapshot")]
    UnknownRecordIdx {
        idx: String,
    },
}

/// Top-level error type for sanmatch.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl MatchError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

/// Result type alias for sanmatch operations.
pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_unknown_kind() {
        let err = ValidationError::UnknownEntityKind {
            code: "X".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains('X'));
        assert!(msg.contains("entity kind"));
    }

    #[test]
    fn test_validation_error_threshold_range() {
        let err = ValidationError::ThresholdOutOfRange { value: 1.5 };
        let msg = format!("{err}");
        assert!(msg.contains("1.5"));
        assert!(msg.contains("out of range"));
    }

    #[test]
    fn test_execution_error_stage_context() {
        let err = ExecutionError::StageFailed {
            stage: "candidate generation".to_string(),
            kind: "organization".to_string(),
            message: "index build failed".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("candidate generation"));
        assert!(msg.contains("organization"));
        assert!(msg.contains("index build failed"));
    }

    #[test]
    fn test_match_error_from_validation() {
        let err: MatchError = ValidationError::EmptyThresholdSweep.into();
        assert!(err.is_validation());
        assert!(!err.is_execution());
    }

    #[test]
    fn test_match_error_from_execution() {
        let err: MatchError = ExecutionError::UnknownRecordIdx {
            idx: "EU.1-0".to_string(),
        }
        .into();
        assert!(err.is_execution());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_match_error_internal() {
        let err = MatchError::internal("unexpected state");
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
        assert!(!err.is_validation());
    }
}
