//! Entity records and the immutable per-run snapshot table.
//!
//! Each sanctions-list row is one name variant of one entity: several `idx`
//! rows may share an `id`. Matching decisions are always made at `id`
//! granularity; similarity scoring operates at `idx` granularity first and
//! is reduced afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which of the two independently maintained sources a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSide {
    /// The "left" list (EU in the original datasets).
    Left,
    /// The "right" list (OFAC in the original datasets).
    Right,
}

impl SourceSide {
    /// The opposite side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl fmt::Display for SourceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// The closed two-value entity discriminator.
///
/// Individuals and organizations have distinct normalization and blocking
/// rules and are always evaluated as separate strata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A human person.
    Individual,
    /// A company, institution, or group.
    Organization,
}

impl EntityKind {
    /// Both kinds, in evaluation order.
    pub const ALL: [Self; 2] = [Self::Individual, Self::Organization];

    /// The single-letter code used by the source tables.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Individual => "I",
            Self::Organization => "O",
        }
    }

    /// Parses the single-letter source code.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownEntityKind`] for any other code;
    /// defaulting here would silently corrupt per-kind metrics.
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        match code {
            "I" => Ok(Self::Individual),
            "O" => Ok(Self::Organization),
            other => Err(ValidationError::UnknownEntityKind {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual => write!(f, "individual"),
            Self::Organization => write!(f, "organization"),
        }
    }
}

/// One name variant of one sanctioned entity.
///
/// `name_norm` is the canonical comparison key produced by the
/// [`normalize`](crate::normalize) module; an empty `name_norm` means the
/// record has no usable name and is excluded from comparison. The blocking
/// attributes (`birth_year` for individuals, `city_norm` + `country_code`
/// for organizations) and the optional unit-norm `embedding` are carried
/// per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Which source list the record comes from.
    pub source: SourceSide,
    /// Stable entity identifier, unique per source, shared by variants.
    pub id: String,
    /// Unique key per name variant: `{id}-{ordinal}`.
    pub idx: String,
    /// Individual or organization.
    pub kind: EntityKind,
    /// The name as published by the source.
    pub name_raw: String,
    /// Canonicalized comparison name (may be empty).
    pub name_norm: String,
    /// Year of birth, individuals only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<u16>,
    /// Normalized city, organizations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_norm: Option<String>,
    /// ISO country code, organizations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Pre-normalized (unit-length) name embedding, if computed upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl EntityRecord {
    /// Creates a record with the given identity and raw name.
    ///
    /// The normalized name and auxiliary attributes start empty; callers
    /// fill them from the normalizer and the source-specific extractors.
    #[must_use]
    pub fn new(
        source: SourceSide,
        id: impl Into<String>,
        ordinal: u32,
        kind: EntityKind,
        name_raw: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let idx = Self::idx_of(&id, ordinal);
        Self {
            source,
            id,
            idx,
            kind,
            name_raw: name_raw.into(),
            name_norm: String::new(),
            birth_year: None,
            city_norm: None,
            country_code: None,
            embedding: None,
        }
    }

    /// The variant key for an entity id and ordinal.
    #[must_use]
    pub fn idx_of(id: &str, ordinal: u32) -> String {
        format!("{id}-{ordinal}")
    }

    /// Returns true if the record carries a usable comparison name.
    #[must_use]
    pub fn has_strong_name(&self) -> bool {
        !self.name_norm.is_empty()
    }

    /// Returns true if the record carries an embedding.
    #[must_use]
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Per-(source, kind) snapshot statistics.
///
/// Mirrors the descriptive counts the evaluation sanity checks rely on:
/// distinct ids, distinct raw and normalized names, and blocking-attribute
/// missingness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStat {
    /// Source list.
    pub source: SourceSide,
    /// Entity kind.
    pub kind: EntityKind,
    /// Total variant rows.
    pub records: u64,
    /// Distinct entity ids.
    pub distinct_ids: u64,
    /// Distinct raw names per id.
    pub distinct_names: u64,
    /// Distinct normalized names per id.
    pub distinct_norm_names: u64,
    /// Rows with an empty normalized name.
    pub weak_names: u64,
    /// Rows missing the birth year.
    pub missing_birth_year: u64,
    /// Rows missing the normalized city.
    pub missing_city: u64,
    /// Rows missing the country code.
    pub missing_country: u64,
}

/// An immutable snapshot of both sources' records for one run.
///
/// All derivations (`distinct_ids`, comparison views, universe counts)
/// are computed over stable sorts so that re-running on unchanged input
/// yields byte-identical output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTable {
    records: Vec<EntityRecord>,
}

impl RecordTable {
    /// Wraps a loaded set of records.
    #[must_use]
    pub fn new(records: Vec<EntityRecord>) -> Self {
        Self { records }
    }

    /// All variant rows.
    #[must_use]
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Number of variant rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First row per `(source, id)` in stable `(source, id, idx)` order.
    #[must_use]
    pub fn distinct_ids(&self) -> Vec<&EntityRecord> {
        let mut rows: Vec<&EntityRecord> = self.records.iter().collect();
        rows.sort_by(|a, b| {
            (a.source == SourceSide::Right, &a.id, &a.idx)
                .cmp(&(b.source == SourceSide::Right, &b.id, &b.idx))
        });
        let mut seen: HashSet<(SourceSide, &str)> = HashSet::new();
        rows.retain(|r| seen.insert((r.source, r.id.as_str())));
        rows
    }

    /// Distinct entity ids on one side.
    #[must_use]
    pub fn ids(&self, side: SourceSide) -> HashSet<&str> {
        self.records
            .iter()
            .filter(|r| r.source == side)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Maps each id on one side to its kind.
    ///
    /// The kind of an entity is a strict function of its `id` (taken from
    /// the first variant row in stable order), never of whichever variant
    /// pair happened to win a score reduction.
    #[must_use]
    pub fn id_kinds(&self, side: SourceSide) -> HashMap<String, EntityKind> {
        self.distinct_ids()
            .into_iter()
            .filter(|r| r.source == side)
            .map(|r| (r.id.clone(), r.kind))
            .collect()
    }

    /// Distinct-id counts `(left, right)` for one kind.
    ///
    /// This is the evaluation universe: every possible id pair of that
    /// kind is `left * right`.
    #[must_use]
    pub fn universe(&self, kind: EntityKind) -> (u64, u64) {
        let mut left = 0u64;
        let mut right = 0u64;
        for row in self.distinct_ids() {
            if row.kind != kind {
                continue;
            }
            match row.source {
                SourceSide::Left => left += 1,
                SourceSide::Right => right += 1,
            }
        }
        (left, right)
    }

    /// Rows of one kind fit for comparison, deduplicated per name variant.
    ///
    /// Only rows with a non-empty normalized name survive (an empty
    /// normalized name is never a valid comparison key). Rows are then
    /// deduplicated per `(source, id, name_norm)` — plus the kind's
    /// blocking attributes when `with_block_attrs` is set — keeping the
    /// first row in stable `(source, id, name_norm, idx)` order.
    #[must_use]
    pub fn comparison_view(&self, kind: EntityKind, with_block_attrs: bool) -> Vec<&EntityRecord> {
        let mut rows: Vec<&EntityRecord> = self
            .records
            .iter()
            .filter(|r| r.kind == kind && r.has_strong_name())
            .collect();
        rows.sort_by(|a, b| {
            (a.source == SourceSide::Right, &a.id, &a.name_norm, &a.idx)
                .cmp(&(b.source == SourceSide::Right, &b.id, &b.name_norm, &b.idx))
        });
        let mut seen: HashSet<(SourceSide, &str, &str, String)> = HashSet::new();
        rows.retain(|r| {
            let attrs = if with_block_attrs {
                variant_attrs(r)
            } else {
                String::new()
            };
            seen.insert((r.source, r.id.as_str(), r.name_norm.as_str(), attrs))
        });
        rows
    }

    /// Descriptive statistics per (source, kind).
    #[must_use]
    pub fn stats(&self) -> Vec<SnapshotStat> {
        let mut out = Vec::with_capacity(4);
        for side in [SourceSide::Left, SourceSide::Right] {
            for kind in EntityKind::ALL {
                let rows: Vec<&EntityRecord> = self
                    .records
                    .iter()
                    .filter(|r| r.source == side && r.kind == kind)
                    .collect();
                let ids: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
                let names: HashSet<(&str, &str)> =
                    rows.iter().map(|r| (r.id.as_str(), r.name_raw.as_str())).collect();
                let norm_names: HashSet<(&str, &str)> = rows
                    .iter()
                    .map(|r| (r.id.as_str(), r.name_norm.as_str()))
                    .collect();
                out.push(SnapshotStat {
                    source: side,
                    kind,
                    records: rows.len() as u64,
                    distinct_ids: ids.len() as u64,
                    distinct_names: names.len() as u64,
                    distinct_norm_names: norm_names.len() as u64,
                    weak_names: rows.iter().filter(|r| !r.has_strong_name()).count() as u64,
                    missing_birth_year: rows.iter().filter(|r| r.birth_year.is_none()).count()
                        as u64,
                    missing_city: rows.iter().filter(|r| r.city_norm.is_none()).count() as u64,
                    missing_country: rows.iter().filter(|r| r.country_code.is_none()).count()
                        as u64,
                });
            }
        }
        out
    }
}

/// Blocking attributes of one row as a stable dedup key component.
fn variant_attrs(record: &EntityRecord) -> String {
    match record.kind {
        EntityKind::Individual => match record.birth_year {
            Some(y) => format!("y:{y}"),
            None => "y:".to_string(),
        },
        EntityKind::Organization => format!(
            "c:{}|{}",
            record.city_norm.as_deref().unwrap_or(""),
            record.country_code.as_deref().unwrap_or("")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        source: SourceSide,
        id: &str,
        ordinal: u32,
        kind: EntityKind,
        name_norm: &str,
    ) -> EntityRecord {
        let mut r = EntityRecord::new(source, id, ordinal, kind, name_norm.to_uppercase());
        r.name_norm = name_norm.to_string();
        r
    }

    #[test]
    fn test_kind_codes_round_trip() {
        assert_eq!(EntityKind::from_code("I").unwrap(), EntityKind::Individual);
        assert_eq!(EntityKind::from_code("O").unwrap(), EntityKind::Organization);
        assert_eq!(EntityKind::Individual.code(), "I");
        assert_eq!(EntityKind::Organization.code(), "O");
    }

    #[test]
    fn test_unknown_kind_code_fails() {
        let err = EntityKind::from_code("P").unwrap_err();
        assert!(format!("{err}").contains('P'));
    }

    #[test]
    fn test_idx_composition() {
        let r = EntityRecord::new(SourceSide::Left, "EU.42", 3, EntityKind::Individual, "x");
        assert_eq!(r.idx, "EU.42-3");
    }

    #[test]
    fn test_distinct_ids_keeps_first_variant() {
        let table = RecordTable::new(vec![
            record(SourceSide::Left, "L1", 1, EntityKind::Individual, "b"),
            record(SourceSide::Left, "L1", 0, EntityKind::Individual, "a"),
            record(SourceSide::Right, "R1", 0, EntityKind::Individual, "c"),
        ]);
        let ids = table.distinct_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].idx, "L1-0");
        assert_eq!(ids[1].idx, "R1-0");
    }

    #[test]
    fn test_universe_counts_ids_not_variants() {
        let table = RecordTable::new(vec![
            record(SourceSide::Left, "L1", 0, EntityKind::Individual, "a"),
            record(SourceSide::Left, "L1", 1, EntityKind::Individual, "b"),
            record(SourceSide::Left, "L2", 0, EntityKind::Organization, "c"),
            record(SourceSide::Right, "R1", 0, EntityKind::Individual, "d"),
        ]);
        assert_eq!(table.universe(EntityKind::Individual), (1, 1));
        assert_eq!(table.universe(EntityKind::Organization), (1, 0));
    }

    #[test]
    fn test_comparison_view_drops_weak_names() {
        let mut weak = record(SourceSide::Left, "L1", 0, EntityKind::Individual, "");
        weak.name_norm = String::new();
        let strong = record(SourceSide::Left, "L2", 0, EntityKind::Individual, "anna");
        let table = RecordTable::new(vec![weak, strong]);
        let view = table.comparison_view(EntityKind::Individual, true);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "L2");
    }

    #[test]
    fn test_comparison_view_dedups_identical_variants() {
        let table = RecordTable::new(vec![
            record(SourceSide::Left, "L1", 0, EntityKind::Individual, "anna schmidt"),
            record(SourceSide::Left, "L1", 1, EntityKind::Individual, "anna schmidt"),
            record(SourceSide::Left, "L1", 2, EntityKind::Individual, "a schmidt"),
        ]);
        let view = table.comparison_view(EntityKind::Individual, true);
        assert_eq!(view.len(), 2);
        // First row in idx order wins for the duplicated normalized name.
        assert!(view.iter().any(|r| r.idx == "L1-0"));
        assert!(view.iter().any(|r| r.idx == "L1-2"));
        assert!(!view.iter().any(|r| r.idx == "L1-1"));
    }

    #[test]
    fn test_comparison_view_keeps_block_attr_variants() {
        let mut a = record(SourceSide::Left, "L1", 0, EntityKind::Individual, "anna");
        a.birth_year = Some(1980);
        let mut b = record(SourceSide::Left, "L1", 1, EntityKind::Individual, "anna");
        b.birth_year = Some(1981);
        let table = RecordTable::new(vec![a, b]);
        assert_eq!(table.comparison_view(EntityKind::Individual, true).len(), 2);
        assert_eq!(table.comparison_view(EntityKind::Individual, false).len(), 1);
    }

    #[test]
    fn test_id_kinds_is_function_of_id() {
        let table = RecordTable::new(vec![
            record(SourceSide::Left, "L1", 0, EntityKind::Organization, "acme"),
            record(SourceSide::Left, "L1", 1, EntityKind::Organization, "acme gmbh"),
        ]);
        let kinds = table.id_kinds(SourceSide::Left);
        assert_eq!(kinds.get("L1"), Some(&EntityKind::Organization));
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn test_stats_counts() {
        let mut a = record(SourceSide::Left, "L1", 0, EntityKind::Individual, "anna");
        a.birth_year = Some(1980);
        let b = record(SourceSide::Left, "L1", 1, EntityKind::Individual, "ann");
        let table = RecordTable::new(vec![a, b]);
        let stats = table.stats();
        let row = stats
            .iter()
            .find(|s| s.source == SourceSide::Left && s.kind == EntityKind::Individual)
            .unwrap();
        assert_eq!(row.records, 2);
        assert_eq!(row.distinct_ids, 1);
        assert_eq!(row.distinct_norm_names, 2);
        assert_eq!(row.missing_birth_year, 1);
    }
}
