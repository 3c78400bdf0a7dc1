//! In-process vector store
//!
//! Brute-force cosine search over namespaced records. Used for offline runs
//! and tests; nothing is persisted.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::providers::vector_store::VectorStoreProvider;
use crate::types::{IndexStats, NamespaceStats, SearchMatch, VectorRecord};

type Namespace = HashMap<String, VectorRecord>;

/// Namespaced in-memory index
#[derive(Default)]
pub struct MemoryVectorStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
    dimension: RwLock<Option<usize>>,
    min_score: Option<f32>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop matches scoring below `min_score`
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Number of records in a namespace
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// The first write fixes the dimension for the whole store.
    /// The batch is checked in full before that dimension is recorded.
    fn check_dimension(&self, records: &[VectorRecord]) -> Result<()> {
        let mut dimension = self.dimension.write();
        let expected = match (*dimension, records.first()) {
            (Some(expected), _) => expected,
            (None, Some(first)) => first.values.len(),
            (None, None) => return Ok(()),
        };

        for record in records {
            if record.values.is_empty() {
                return Err(Error::vector_store(format!(
                    "Record {} has an empty vector",
                    record.id
                )));
            }
            if record.values.len() != expected {
                return Err(Error::vector_store(format!(
                    "Record {} has dimension {}, index has {}",
                    record.id,
                    record.values.len(),
                    expected
                )));
            }
        }

        *dimension = Some(expected);
        Ok(())
    }
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        self.check_dimension(records)?;

        let mut namespaces = self.namespaces.write();
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        if let Some(expected) = *self.dimension.read() {
            if vector.len() != expected {
                return Err(Error::search(format!(
                    "Query vector has dimension {}, index has {}",
                    vector.len(),
                    expected
                )));
            }
        }

        let namespaces = self.namespaces.read();
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<SearchMatch> = entries
            .values()
            .map(|record| SearchMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: if include_metadata {
                    record.metadata.clone()
                } else {
                    Default::default()
                },
            })
            .filter(|m| self.min_score.map_or(true, |min| m.score >= min))
            .collect();

        // Ties broken by id so results are stable
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn describe_stats(&self, namespace: Option<&str>) -> Result<IndexStats> {
        let namespaces = self.namespaces.read();
        let counts: BTreeMap<String, NamespaceStats> = namespaces
            .iter()
            .filter(|(name, _)| namespace.map_or(true, |ns| ns == name.as_str()))
            .map(|(name, entries)| {
                (
                    name.clone(),
                    NamespaceStats {
                        vector_count: entries.len() as u64,
                    },
                )
            })
            .collect();

        Ok(IndexStats {
            dimension: *self.dimension.read(),
            total_vector_count: counts.values().map(|ns| ns.vector_count).sum(),
            namespaces: counts,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
