//! Ground-truth reconciliation from the external cross-reference feed.
//!
//! The consolidated feed asserts, per cluster, which source-specific
//! referents belong to one real-world entity. Referents are prefixed and
//! re-encoded per source; decoders recover the native ids. Only clusters
//! with exactly one decodable referent per source yield a pairwise link;
//! everything else is counted and dropped — pairwise evaluation cannot
//! use it. Links referencing ids absent from the current snapshot are
//! dropped too: the feed may describe a different list snapshot than the
//! one under evaluation, and stale references must not inflate false
//! negatives.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::record::{EntityKind, SourceSide};

/// One row of the external cross-reference feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRefEntry {
    /// External cluster identifier.
    pub cluster_id: String,
    /// Which source list the referent points into.
    pub source: SourceSide,
    /// The encoded source-specific identifier.
    pub referent: String,
}

/// Decodes encoded referents back to a source's native id format.
///
/// The rule is an anchored single-capture pattern plus ordered literal
/// replacements applied to the captured text. The defaults reproduce the
/// original feed's encodings.
#[derive(Debug, Clone)]
pub struct ReferentDecoder {
    pattern: Regex,
    replacements: Vec<(String, String)>,
}

impl ReferentDecoder {
    /// Builds a decoder from a capture pattern and literal replacements.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPattern`] if the pattern does
    /// not compile and [`ValidationError::MissingReferentCapture`] if it
    /// has no capture group.
    pub fn new(pattern: &str, replacements: &[(&str, &str)]) -> Result<Self, ValidationError> {
        let compiled = Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        if compiled.captures_len() < 2 {
            return Err(ValidationError::MissingReferentCapture {
                pattern: pattern.to_string(),
            });
        }
        Ok(Self {
            pattern: compiled,
            replacements: replacements
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        })
    }

    /// The default decoder for the left (EU-style) referent encoding:
    /// strip the `eu-fsf-` prefix, turn `-` into `.`, restore the
    /// upper-case `EU.` lead.
    #[must_use]
    pub fn left_default() -> Self {
        Self::new("^eu-fsf-(.+)$", &[("-", "."), ("eu.", "EU.")])
            .expect("default left referent pattern compiles")
    }

    /// The default decoder for the right (OFAC-style) referent encoding:
    /// strip the `ofac-` prefix from an all-digit id.
    #[must_use]
    pub fn right_default() -> Self {
        Self::new(r"^ofac-(\d+)$", &[]).expect("default right referent pattern compiles")
    }

    /// Decodes one referent, or `None` if it does not match the pattern.
    #[must_use]
    pub fn decode(&self, referent: &str) -> Option<String> {
        let captured = self.pattern.captures(referent)?.get(1)?.as_str().to_string();
        let mut id = captured;
        for (from, to) in &self.replacements {
            id = id.replace(from, to);
        }
        Some(id)
    }
}

/// An asserted true correspondence between a left and a right entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealLink {
    /// Left-source native id.
    pub id_left: String,
    /// Right-source native id.
    pub id_right: String,
}

/// Exclusion and retention counts from reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Clusters examined.
    pub clusters_seen: u64,
    /// Clusters yielding a pairwise link.
    pub linked: u64,
    /// Clusters with referents from only one source.
    pub single_source: u64,
    /// Clusters with more than one decodable referent on a side.
    pub multi_referent: u64,
    /// Referents matching no decoder pattern.
    pub undecodable_referents: u64,
    /// Links dropped because the left id is absent from the snapshot.
    pub dropped_missing_left: u64,
    /// Links dropped because the right id is absent from the snapshot.
    pub dropped_missing_right: u64,
    /// Links dropped because the two ids disagree on entity kind.
    pub dropped_kind_mismatch: u64,
}

/// The set of real links for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealLinkSet {
    links: Vec<RealLink>,
}

impl RealLinkSet {
    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if there are no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterates the links in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &RealLink> {
        self.links.iter()
    }

    /// Returns true if the id pair is an asserted true correspondence.
    #[must_use]
    pub fn contains(&self, id_left: &str, id_right: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.id_left == id_left && l.id_right == id_right)
    }

    /// Drops links whose ids are absent from the current snapshot.
    ///
    /// Updates the per-reason drop counts in `stats`.
    pub fn retain_present(
        &mut self,
        left_ids: &HashSet<&str>,
        right_ids: &HashSet<&str>,
        stats: &mut ReconcileStats,
    ) {
        self.links.retain(|link| {
            if !left_ids.contains(link.id_left.as_str()) {
                debug!(id_left = %link.id_left, "dropping link: left id not in snapshot");
                stats.dropped_missing_left += 1;
                return false;
            }
            if !right_ids.contains(link.id_right.as_str()) {
                debug!(id_right = %link.id_right, "dropping link: right id not in snapshot");
                stats.dropped_missing_right += 1;
                return false;
            }
            true
        });
    }

    /// Drops links whose two ids disagree on entity kind.
    ///
    /// The feed occasionally clusters a person with an organization; such
    /// a link belongs to neither per-kind evaluation stratum and would
    /// break the universe accounting of the confusion matrix.
    ///
    /// Updates `dropped_kind_mismatch` in `stats`.
    pub fn retain_matching_kinds(
        &mut self,
        left_kinds: &HashMap<String, EntityKind>,
        right_kinds: &HashMap<String, EntityKind>,
        stats: &mut ReconcileStats,
    ) {
        self.links.retain(|link| {
            match (left_kinds.get(&link.id_left), right_kinds.get(&link.id_right)) {
                (Some(left), Some(right)) if left != right => {
                    debug!(
                        id_left = %link.id_left,
                        id_right = %link.id_right,
                        "dropping link: ids disagree on kind"
                    );
                    stats.dropped_kind_mismatch += 1;
                    false
                }
                _ => true,
            }
        });
    }
}

impl FromIterator<RealLink> for RealLinkSet {
    fn from_iter<I: IntoIterator<Item = RealLink>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}

/// Maps the cross-reference feed to pairwise real links.
///
/// Clusters are processed in deterministic (sorted) order. A cluster
/// produces a link only when it has exactly one decodable referent per
/// source; single-source and multi-referent clusters are counted in the
/// returned [`ReconcileStats`] and dropped.
#[must_use]
pub fn reconcile(
    entries: &[CrossRefEntry],
    left_decoder: &ReferentDecoder,
    right_decoder: &ReferentDecoder,
) -> (RealLinkSet, ReconcileStats) {
    let mut clusters: BTreeMap<&str, (Vec<String>, Vec<String>)> = BTreeMap::new();
    let mut stats = ReconcileStats::default();
    for entry in entries {
        let bucket = clusters.entry(entry.cluster_id.as_str()).or_default();
        let decoded = match entry.source {
            SourceSide::Left => left_decoder.decode(&entry.referent),
            SourceSide::Right => right_decoder.decode(&entry.referent),
        };
        match decoded {
            Some(id) => match entry.source {
                SourceSide::Left => bucket.0.push(id),
                SourceSide::Right => bucket.1.push(id),
            },
            None => {
                debug!(referent = %entry.referent, "referent matches no decoder pattern");
                stats.undecodable_referents += 1;
            }
        }
    }
    let mut links = Vec::new();
    for (cluster_id, (left, right)) in clusters {
        stats.clusters_seen += 1;
        match (left.len(), right.len()) {
            (1, 1) => {
                stats.linked += 1;
                links.push(RealLink {
                    id_left: left.into_iter().next().unwrap_or_default(),
                    id_right: right.into_iter().next().unwrap_or_default(),
                });
            }
            (0, _) | (_, 0) => {
                debug!(cluster_id, "cluster covers a single source");
                stats.single_source += 1;
            }
            _ => {
                debug!(cluster_id, "cluster has multiple referents per source");
                stats.multi_referent += 1;
            }
        }
    }
    (links.into_iter().collect(), stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cluster: &str, source: SourceSide, referent: &str) -> CrossRefEntry {
        CrossRefEntry {
            cluster_id: cluster.to_string(),
            source,
            referent: referent.to_string(),
        }
    }

    #[test]
    fn test_left_decoder_rewrites_separators() {
        let decoder = ReferentDecoder::left_default();
        assert_eq!(decoder.decode("eu-fsf-eu-123-45"), Some("EU.123.45".to_string()));
        assert_eq!(decoder.decode("ofac-123"), None);
    }

    #[test]
    fn test_right_decoder_strips_prefix() {
        let decoder = ReferentDecoder::right_default();
        assert_eq!(decoder.decode("ofac-9876"), Some("9876".to_string()));
        assert_eq!(decoder.decode("ofac-12a"), None);
        assert_eq!(decoder.decode("eu-fsf-eu-1"), None);
    }

    #[test]
    fn test_decoder_requires_capture_group() {
        assert!(matches!(
            ReferentDecoder::new("^ofac-", &[]),
            Err(ValidationError::MissingReferentCapture { .. })
        ));
    }

    #[test]
    fn test_reconcile_pairwise_cluster() {
        let entries = vec![
            entry("os-1", SourceSide::Left, "eu-fsf-eu-1"),
            entry("os-1", SourceSide::Right, "ofac-100"),
        ];
        let (links, stats) = reconcile(
            &entries,
            &ReferentDecoder::left_default(),
            &ReferentDecoder::right_default(),
        );
        assert_eq!(links.len(), 1);
        assert!(links.contains("EU.1", "100"));
        assert_eq!(stats.linked, 1);
        assert_eq!(stats.clusters_seen, 1);
    }

    #[test]
    fn test_reconcile_drops_single_source_cluster() {
        let entries = vec![entry("os-1", SourceSide::Left, "eu-fsf-eu-1")];
        let (links, stats) = reconcile(
            &entries,
            &ReferentDecoder::left_default(),
            &ReferentDecoder::right_default(),
        );
        assert!(links.is_empty());
        assert_eq!(stats.single_source, 1);
    }

    #[test]
    fn test_reconcile_drops_multi_referent_cluster() {
        let entries = vec![
            entry("os-1", SourceSide::Left, "eu-fsf-eu-1"),
            entry("os-1", SourceSide::Left, "eu-fsf-eu-2"),
            entry("os-1", SourceSide::Right, "ofac-100"),
        ];
        let (links, stats) = reconcile(
            &entries,
            &ReferentDecoder::left_default(),
            &ReferentDecoder::right_default(),
        );
        assert!(links.is_empty());
        assert_eq!(stats.multi_referent, 1);
    }

    #[test]
    fn test_reconcile_counts_undecodable() {
        let entries = vec![
            entry("os-1", SourceSide::Left, "interpol-77"),
            entry("os-1", SourceSide::Right, "ofac-100"),
        ];
        let (links, stats) = reconcile(
            &entries,
            &ReferentDecoder::left_default(),
            &ReferentDecoder::right_default(),
        );
        assert!(links.is_empty());
        assert_eq!(stats.undecodable_referents, 1);
        assert_eq!(stats.single_source, 1);
    }

    #[test]
    fn test_retain_present_drops_stale_links() {
        let mut links: RealLinkSet = vec![
            RealLink {
                id_left: "EU.1".to_string(),
                id_right: "100".to_string(),
            },
            RealLink {
                id_left: "EU.2".to_string(),
                id_right: "200".to_string(),
            },
        ]
        .into_iter()
        .collect();
        let left: HashSet<&str> = ["EU.1"].into_iter().collect();
        let right: HashSet<&str> = ["100", "200"].into_iter().collect();
        let mut stats = ReconcileStats::default();
        links.retain_present(&left, &right, &mut stats);
        assert_eq!(links.len(), 1);
        assert!(links.contains("EU.1", "100"));
        assert_eq!(stats.dropped_missing_left, 1);
        assert_eq!(stats.dropped_missing_right, 0);
    }

    #[test]
    fn test_retain_matching_kinds_drops_cross_kind_links() {
        let mut links: RealLinkSet = vec![
            RealLink {
                id_left: "EU.1".to_string(),
                id_right: "100".to_string(),
            },
            RealLink {
                id_left: "EU.2".to_string(),
                id_right: "200".to_string(),
            },
        ]
        .into_iter()
        .collect();
        let left_kinds: HashMap<String, EntityKind> = [
            ("EU.1".to_string(), EntityKind::Individual),
            ("EU.2".to_string(), EntityKind::Organization),
        ]
        .into_iter()
        .collect();
        let right_kinds: HashMap<String, EntityKind> = [
            ("100".to_string(), EntityKind::Organization),
            ("200".to_string(), EntityKind::Organization),
        ]
        .into_iter()
        .collect();
        let mut stats = ReconcileStats::default();
        links.retain_matching_kinds(&left_kinds, &right_kinds, &mut stats);
        assert_eq!(links.len(), 1);
        assert!(links.contains("EU.2", "200"));
        assert_eq!(stats.dropped_kind_mismatch, 1);
    }
}
