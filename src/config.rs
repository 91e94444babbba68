//! Per-run matching configuration.
//!
//! Everything the original pipeline kept as module-level parameter maps
//! (blocking columns per kind, neighbor counts, similarity radii, the
//! threshold sweep) is an explicit configuration record here, passed into
//! each stage call. Configuration problems fail the run before any stage
//! executes; silently defaulting would corrupt the metrics.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::record::EntityKind;

/// Candidate-generation strategy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Exact-key blocking plus the string-similarity ensemble.
    Blocking,
    /// Embedding nearest neighbors: top-k per query record.
    TopK,
    /// Embedding nearest neighbors: all within a similarity radius.
    Radius,
}

impl Strategy {
    /// Returns true if the strategy retrieves over embeddings.
    #[must_use]
    pub const fn uses_embeddings(self) -> bool {
        matches!(self, Self::TopK | Self::Radius)
    }
}

/// A value configured separately for each entity kind.
///
/// Name distributions differ between individuals and organizations, so
/// neighbor counts, radii and blocking keys are always per-kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKind<T> {
    /// Value for individuals.
    pub individual: T,
    /// Value for organizations.
    pub organization: T,
}

impl<T> PerKind<T> {
    /// Builds a per-kind pair.
    pub const fn new(individual: T, organization: T) -> Self {
        Self {
            individual,
            organization,
        }
    }

    /// The value for one kind.
    pub const fn get(&self, kind: EntityKind) -> &T {
        match kind {
            EntityKind::Individual => &self.individual,
            EntityKind::Organization => &self.organization,
        }
    }
}

impl<T: Clone> PerKind<T> {
    /// The same value for both kinds.
    pub fn uniform(value: T) -> Self {
        Self {
            individual: value.clone(),
            organization: value,
        }
    }
}

/// One blocking attribute of an entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockAttribute {
    /// Year of birth (individuals).
    BirthYear,
    /// Normalized city (organizations).
    City,
    /// ISO country code (organizations).
    CountryCode,
}

/// Exact-key blocking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// Blocking attributes per kind; the cross-product is formed within
    /// each left/right partition sharing an identical key tuple.
    pub keys: PerKind<Vec<BlockAttribute>>,
    /// Whether a key missing on both sides forms a matching block.
    ///
    /// The original pipeline matches missing-missing (a recall-maximizing
    /// tradeoff for sparse attributes); set to false to exclude any pair
    /// with a missing key component instead. One-side-missing never
    /// matches either way.
    pub match_missing_keys: bool,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            keys: PerKind::new(
                vec![BlockAttribute::BirthYear],
                vec![BlockAttribute::City, BlockAttribute::CountryCode],
            ),
            match_missing_keys: true,
        }
    }
}

/// Vector neighbor-search configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborConfig {
    /// Neighbors retrieved per query record in top-k mode.
    pub k: PerKind<usize>,
    /// Minimum similarity in radius mode.
    pub radius: PerKind<f32>,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            k: PerKind::uniform(8),
            radius: PerKind::new(0.80, 0.70),
        }
    }
}

/// Complete configuration for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Candidate-generation strategy.
    pub strategy: Strategy,
    /// Exact-key blocking parameters.
    pub blocking: BlockingConfig,
    /// Neighbor-search parameters.
    pub neighbors: NeighborConfig,
    /// Decision thresholds, monotonically increasing, each evaluated
    /// independently.
    pub thresholds: Vec<f32>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Blocking,
            blocking: BlockingConfig::default(),
            neighbors: NeighborConfig::default(),
            thresholds: vec![0.70, 0.75, 0.80, 0.85, 0.90, 0.95, 1.00],
        }
    }
}

impl MatchConfig {
    /// Checks the configuration before any stage runs.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty or non-increasing
    /// threshold sweep, thresholds outside `[0, 1]`, a zero neighbor
    /// count, a radius outside `[-1, 1]`, or an empty blocking key list.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.thresholds.is_empty() {
            return Err(ValidationError::EmptyThresholdSweep);
        }
        for &t in &self.thresholds {
            if !(0.0..=1.0).contains(&t) {
                return Err(ValidationError::ThresholdOutOfRange { value: t });
            }
        }
        for pair in self.thresholds.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ValidationError::NonIncreasingThresholds {
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        for kind in EntityKind::ALL {
            if *self.neighbors.k.get(kind) == 0 {
                return Err(ValidationError::InvalidNeighborCount {
                    kind: kind.to_string(),
                });
            }
            let radius = *self.neighbors.radius.get(kind);
            if !(-1.0..=1.0).contains(&radius) {
                return Err(ValidationError::RadiusOutOfRange {
                    kind: kind.to_string(),
                    value: radius,
                });
            }
            if self.blocking.keys.get(kind).is_empty() {
                return Err(ValidationError::EmptyBlockingKeys {
                    kind: kind.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_thresholds_fail() {
        let mut config = MatchConfig::default();
        config.thresholds.clear();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyThresholdSweep)
        ));
    }

    #[test]
    fn test_threshold_out_of_range_fails() {
        let mut config = MatchConfig::default();
        config.thresholds = vec![0.5, 1.5];
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ThresholdOutOfRange { .. })
        ));
    }

    #[test]
    fn test_non_increasing_thresholds_fail() {
        let mut config = MatchConfig::default();
        config.thresholds = vec![0.9, 0.8];
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NonIncreasingThresholds { .. })
        ));
    }

    #[test]
    fn test_zero_neighbor_count_fails() {
        let mut config = MatchConfig::default();
        config.neighbors.k.organization = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidNeighborCount { .. })
        ));
    }

    #[test]
    fn test_radius_out_of_range_fails() {
        let mut config = MatchConfig::default();
        config.neighbors.radius.individual = 1.25;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::RadiusOutOfRange { .. })
        ));
    }

    #[test]
    fn test_per_kind_lookup() {
        let per_kind = PerKind::new(3usize, 7usize);
        assert_eq!(*per_kind.get(EntityKind::Individual), 3);
        assert_eq!(*per_kind.get(EntityKind::Organization), 7);
    }
}
