//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{IndexStats, SearchMatch, VectorRecord};

/// Trait for a namespaced vector index
///
/// Implementations:
/// - `PineconeIndex`: hosted Pinecone index
/// - `MemoryVectorStore`: in-process brute-force index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert or overwrite records by ID; returns the number written
    ///
    /// Concurrent upserts carry no ordering guarantee between each other.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Top-K nearest neighbours, highest score first
    ///
    /// An empty namespace yields an empty list, not an error.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>>;

    /// Record counts and dimensionality, for diagnostics
    async fn describe_stats(&self, namespace: Option<&str>) -> Result<IndexStats>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
