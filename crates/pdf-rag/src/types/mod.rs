//! Core types for documents, chunks and index records

pub mod document;
pub mod record;

pub use document::{Chunk, ChunkMetadata, Document, DocumentMetadata};
pub use record::{IndexStats, NamespaceStats, SearchMatch, VectorRecord};
