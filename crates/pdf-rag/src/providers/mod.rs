//! Provider abstractions for embeddings, answer generation and vector storage
//!
//! Traits keep the pipeline independent of the hosted services; the Gemini
//! and Pinecone implementations talk to the real APIs, `MemoryVectorStore`
//! runs everything in process.

pub mod embedding;
pub mod gemini;
pub mod http;
pub mod llm;
pub mod memory;
pub mod pinecone;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::{GeminiClient, GeminiEmbedder, GeminiModels, ModelInfo};
pub use http::HttpClient;
pub use llm::LlmProvider;
pub use memory::MemoryVectorStore;
pub use pinecone::PineconeIndex;
pub use vector_store::VectorStoreProvider;

use std::sync::Arc;

use crate::config::{RagConfig, VectorBackend};
use crate::error::Result;

/// Build the vector store selected by `VECTOR_BACKEND`
pub async fn vector_store_from_config(
    config: &RagConfig,
    http: HttpClient,
) -> Result<Arc<dyn VectorStoreProvider>> {
    match config.vector_db.backend {
        VectorBackend::Pinecone => Ok(Arc::new(PineconeIndex::connect(config, http).await?)),
        VectorBackend::Memory => {
            tracing::warn!("Using in-memory vector store; records are lost on exit");
            Ok(Arc::new(
                MemoryVectorStore::new().with_min_score(config.retrieval.min_score),
            ))
        }
    }
}
