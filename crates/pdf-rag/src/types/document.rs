//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Source information for a loaded page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Path of the source file
    pub source: String,
    /// Page number (1-indexed); `None` when the page structure was lost
    pub page_number: Option<u32>,
    /// Total pages in the source file
    pub total_pages: Option<u32>,
}

/// Raw text of one logical unit (a PDF page) of the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted text
    pub text: String,
    /// Source information
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document for one page of a source file
    pub fn page(
        source: impl Into<String>,
        text: impl Into<String>,
        page: u32,
        total_pages: u32,
    ) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page_number: Some(page),
                total_pages: Some(total_pages),
            },
        }
    }

    /// Create a document without page information
    pub fn whole(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page_number: None,
                total_pages: None,
            },
        }
    }
}

/// Source and position information for a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Path of the source file
    pub source: String,
    /// Page number (1-indexed)
    pub page_number: Option<u32>,
    /// Total pages in the source file
    pub total_pages: Option<u32>,
    /// Position of the chunk within the ingestion run
    pub chunk_index: u32,
    /// Character offsets within the page text
    pub char_start: usize,
    pub char_end: usize,
    /// Line range within the page text (1-indexed, inclusive)
    pub line_from: u32,
    pub line_to: u32,
}

/// A bounded, overlapping slice of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic chunk ID
    pub id: String,
    /// Text content
    pub text: String,
    /// Source information
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk; the ID is derived from source, page, offset and text
    pub fn new(text: String, metadata: ChunkMetadata) -> Self {
        let id = chunk_id(
            &metadata.source,
            metadata.page_number,
            metadata.char_start,
            &text,
        );
        Self { id, text, metadata }
    }

    /// Whether the chunk holds anything worth embedding
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Convert to vector metadata for storage
    pub fn to_vector_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("text".to_string(), json!(self.text));
        meta.insert("source".to_string(), json!(self.metadata.source));
        meta.insert("chunkIndex".to_string(), json!(self.metadata.chunk_index));

        if let Some(page) = self.metadata.page_number {
            meta.insert("pageNumber".to_string(), json!(page));
        }
        if let Some(total) = self.metadata.total_pages {
            meta.insert("totalPages".to_string(), json!(total));
        }

        // Pinecone metadata must be flat, so nested locations use dotted keys
        meta.insert("loc.lines.from".to_string(), json!(self.metadata.line_from));
        meta.insert("loc.lines.to".to_string(), json!(self.metadata.line_to));

        meta
    }
}

/// Stable chunk ID: re-ingesting the same text overwrites instead of duplicating
fn chunk_id(source: &str, page: Option<u32>, char_start: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(page.unwrap_or(0).to_le_bytes());
    hasher.update((char_start as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(char_start: usize) -> ChunkMetadata {
        ChunkMetadata {
            source: "sample.pdf".to_string(),
            page_number: Some(2),
            total_pages: Some(3),
            chunk_index: 0,
            char_start,
            char_end: char_start + 5,
            line_from: 1,
            line_to: 1,
        }
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let a = Chunk::new("hello".to_string(), metadata(0));
        let b = Chunk::new("hello".to_string(), metadata(0));
        let c = Chunk::new("hello".to_string(), metadata(10));

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn test_vector_metadata_carries_text() {
        let chunk = Chunk::new("The capital of Freedonia is Lepidopolis.".to_string(), metadata(0));
        let meta = chunk.to_vector_metadata();

        assert_eq!(meta["text"], json!("The capital of Freedonia is Lepidopolis."));
        assert_eq!(meta["pageNumber"], json!(2));
        assert_eq!(meta["loc.lines.from"], json!(1));
    }
}
