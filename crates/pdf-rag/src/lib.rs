//! pdf-rag: Retrieval-augmented question answering over a single PDF
//!
//! Ingestion loads a PDF page by page, splits the pages into overlapping
//! chunks, embeds them and upserts them into a namespaced vector index.
//! The query flow embeds each question, retrieves the top matches, and asks a
//! generative model to answer from that context only.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkMetadata, Document, DocumentMetadata},
    record::{IndexStats, NamespaceStats, SearchMatch, VectorRecord},
};
