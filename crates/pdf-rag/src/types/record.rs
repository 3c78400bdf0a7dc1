//! Vector index record, match and statistics types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::document::Chunk;

/// An (id, vector, metadata) triple stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Pair a chunk with its embedding
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            values,
            metadata: chunk.to_vector_metadata(),
        }
    }
}

/// One hit from a top-K query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchMatch {
    /// Stored chunk text
    ///
    /// Records written by other loaders keep their text under `pageContent`.
    pub fn text(&self) -> Option<&str> {
        ["text", "pageContent"]
            .iter()
            .filter_map(|key| self.metadata.get(*key).and_then(Value::as_str))
            .find(|text| !text.trim().is_empty())
    }
}

/// Per-namespace index statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Index statistics used for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl IndexStats {
    /// Vector count for one namespace (0 when absent)
    pub fn namespace_count(&self, namespace: &str) -> u64 {
        self.namespaces
            .get(namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_match(metadata: Value) -> SearchMatch {
        SearchMatch {
            id: "a".to_string(),
            score: 0.9,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_text_prefers_text_then_page_content() {
        assert_eq!(search_match(json!({"text": "one", "pageContent": "two"})).text(), Some("one"));
        assert_eq!(search_match(json!({"pageContent": "two"})).text(), Some("two"));
        assert_eq!(search_match(json!({"source": "x.pdf"})).text(), None);
        assert_eq!(search_match(json!({"text": "  "})).text(), None);
    }

    #[test]
    fn test_stats_deserialize_from_pinecone_shape() {
        let stats: IndexStats = serde_json::from_value(json!({
            "namespaces": {"TEST-namespace": {"vectorCount": 12}},
            "dimension": 768,
            "indexFullness": 0.0,
            "totalVectorCount": 12
        }))
        .unwrap();

        assert_eq!(stats.dimension, Some(768));
        assert_eq!(stats.total_vector_count, 12);
        assert_eq!(stats.namespace_count("TEST-namespace"), 12);
        assert_eq!(stats.namespace_count("other"), 0);
    }
}
