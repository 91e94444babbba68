//! Candidate-pair generation.
//!
//! Two interchangeable strategies feed the scorer: exact-key blocking
//! (a hash join on the per-kind blocking key) and vector neighbor search
//! over unit-norm name embeddings (an exact flat inner-product index with
//! top-k and range retrieval). A record that lands in no block or yields
//! no neighbors contributes no pairs for itself; its true matches surface
//! downstream as blocking false negatives, never as silent drops.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::{BlockAttribute, BlockingConfig};
use crate::error::ValidationError;
use crate::record::{EntityKind, EntityRecord, RecordTable, SourceSide};
use crate::score::ScoredPair;

/// A pair of name variants selected for similarity scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePair {
    /// Left name-variant key.
    pub idx_left: String,
    /// Right name-variant key.
    pub idx_right: String,
    /// Entity kind of the pair.
    pub kind: EntityKind,
}

/// One blocking key component; `None` marks a missing attribute.
type KeyComponent = Option<String>;

fn key_component(record: &EntityRecord, attr: BlockAttribute) -> KeyComponent {
    match attr {
        BlockAttribute::BirthYear => record.birth_year.map(|y| y.to_string()),
        BlockAttribute::City => record.city_norm.clone(),
        BlockAttribute::CountryCode => record.country_code.clone(),
    }
}

/// The full blocking key of a record, or `None` if the record is excluded.
///
/// With `match_missing_keys`, a missing component is a key value in its
/// own right, so two records missing the same component share a block.
/// Without it, any missing component excludes the record. One-sided
/// missingness never matches in either mode (the keys differ).
fn block_key(record: &EntityRecord, config: &BlockingConfig) -> Option<Vec<KeyComponent>> {
    let attrs = config.keys.get(record.kind);
    let key: Vec<KeyComponent> = attrs.iter().map(|&a| key_component(record, a)).collect();
    if !config.match_missing_keys && key.iter().any(Option::is_none) {
        return None;
    }
    Some(key)
}

/// Generates candidates by exact-key blocking for one kind.
///
/// Operates on the comparison view (strong names, deduplicated per name
/// variant and blocking attributes) and emits the cross-product within
/// each left/right partition sharing an identical key tuple, in stable
/// view order.
#[must_use]
pub fn block_candidates(
    table: &RecordTable,
    kind: EntityKind,
    config: &BlockingConfig,
) -> Vec<CandidatePair> {
    let view = table.comparison_view(kind, true);
    let mut right_blocks: HashMap<Vec<KeyComponent>, Vec<&EntityRecord>> = HashMap::new();
    for record in view.iter().filter(|r| r.source == SourceSide::Right) {
        if let Some(key) = block_key(record, config) {
            right_blocks.entry(key).or_default().push(record);
        }
    }
    let mut pairs = Vec::new();
    for record in view.iter().filter(|r| r.source == SourceSide::Left) {
        let Some(key) = block_key(record, config) else {
            continue;
        };
        let Some(partners) = right_blocks.get(&key) else {
            continue;
        };
        for partner in partners {
            pairs.push(CandidatePair {
                idx_left: record.idx.clone(),
                idx_right: partner.idx.clone(),
                kind,
            });
        }
    }
    pairs
}

/// One retrieval hit from the neighbor index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row position in the index.
    pub row: usize,
    /// Inner-product similarity to the query.
    pub similarity: f32,
}

/// Exact flat inner-product index over one side's unit-norm embeddings.
///
/// Inner product equals cosine similarity because the vectors are
/// pre-normalized upstream. Retrieval is a full scan per query; queries
/// are parallelized by the caller.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    dim: usize,
    vectors: Vec<f32>,
    rows: Vec<(String, String)>,
}

impl NeighborIndex {
    /// Builds the index from records carrying embeddings.
    ///
    /// Records without an embedding are skipped (they cannot be
    /// retrieved; their true matches become blocking false negatives).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmbeddingDimension`] if the
    /// embeddings disagree on dimensionality.
    pub fn build(records: &[&EntityRecord]) -> Result<Self, ValidationError> {
        let mut dim = 0usize;
        let mut vectors = Vec::new();
        let mut rows = Vec::new();
        for record in records {
            let Some(embedding) = &record.embedding else {
                debug!(idx = %record.idx, "skipping record without embedding");
                continue;
            };
            if dim == 0 {
                dim = embedding.len();
            } else if embedding.len() != dim {
                return Err(ValidationError::InvalidEmbeddingDimension {
                    actual: embedding.len(),
                    expected: dim,
                });
            }
            vectors.extend_from_slice(embedding);
            rows.push((record.id.clone(), record.idx.clone()));
        }
        Ok(Self { dim, vectors, rows })
    }

    /// Number of indexed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Embedding dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `(id, idx)` of one indexed row.
    #[must_use]
    pub fn row(&self, position: usize) -> (&str, &str) {
        let (id, idx) = &self.rows[position];
        (id, idx)
    }

    fn similarities(&self, query: &[f32]) -> Vec<f32> {
        self.vectors
            .chunks_exact(self.dim)
            .map(|v| v.iter().zip(query).map(|(a, b)| a * b).sum())
            .collect()
    }

    fn check_query(&self, query: &[f32]) -> Result<(), ValidationError> {
        if query.len() != self.dim {
            return Err(ValidationError::InvalidEmbeddingDimension {
                actual: query.len(),
                expected: self.dim,
            });
        }
        Ok(())
    }

    /// The `k` most similar rows, sorted by descending similarity with
    /// row-position tie breaks.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmbeddingDimension`] if the
    /// query dimensionality disagrees with the index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, ValidationError> {
        self.check_query(query)?;
        let mut hits: Vec<Neighbor> = self
            .similarities(query)
            .into_iter()
            .enumerate()
            .map(|(row, similarity)| Neighbor { row, similarity })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.row.cmp(&b.row))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// All rows with similarity at or above `min_similarity`, sorted by
    /// descending similarity with row-position tie breaks.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmbeddingDimension`] if the
    /// query dimensionality disagrees with the index.
    pub fn range_search(
        &self,
        query: &[f32],
        min_similarity: f32,
    ) -> Result<Vec<Neighbor>, ValidationError> {
        self.check_query(query)?;
        let mut hits: Vec<Neighbor> = self
            .similarities(query)
            .into_iter()
            .enumerate()
            .filter(|&(_, s)| s >= min_similarity)
            .map(|(row, similarity)| Neighbor { row, similarity })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.row.cmp(&b.row))
        });
        Ok(hits)
    }
}

/// Neighbor retrieval mode for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Retrieval {
    /// Top-k nearest neighbors per query.
    TopK(usize),
    /// All neighbors within a minimum-similarity radius.
    Radius(f32),
}

/// Generates scored candidates by embedding neighbor search for one kind.
///
/// The right side is indexed and every left record with an embedding
/// queries it in parallel. The retrieval similarity is the pair's score,
/// so this emits [`ScoredPair`] rows directly.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmbeddingDimension`] if the two
/// sides disagree on embedding dimensionality.
pub fn neighbor_candidates(
    table: &RecordTable,
    kind: EntityKind,
    retrieval: Retrieval,
) -> Result<Vec<ScoredPair>, ValidationError> {
    let view = table.comparison_view(kind, false);
    let right: Vec<&EntityRecord> = view
        .iter()
        .copied()
        .filter(|r| r.source == SourceSide::Right)
        .collect();
    let index = NeighborIndex::build(&right)?;
    if index.is_empty() {
        return Ok(Vec::new());
    }
    let left: Vec<&EntityRecord> = view
        .iter()
        .copied()
        .filter(|r| r.source == SourceSide::Left && r.has_embedding())
        .collect();
    let results: Result<Vec<Vec<ScoredPair>>, ValidationError> = left
        .par_iter()
        .map(|record| {
            // `left` is filtered on has_embedding above.
            let Some(query) = record.embedding.as_deref() else {
                return Ok(Vec::new());
            };
            let hits = match retrieval {
                Retrieval::TopK(k) => index.search(query, k)?,
                Retrieval::Radius(radius) => index.range_search(query, radius)?,
            };
            Ok(hits
                .into_iter()
                .map(|hit| {
                    let (id_right, idx_right) = index.row(hit.row);
                    ScoredPair {
                        id_left: record.id.clone(),
                        id_right: id_right.to_string(),
                        idx_left: record.idx.clone(),
                        idx_right: idx_right.to_string(),
                        kind,
                        score: hit.similarity,
                    }
                })
                .collect())
        })
        .collect();
    Ok(results?.into_iter().flatten().collect())
}
