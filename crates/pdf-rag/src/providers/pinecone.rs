//! Pinecone serverless index provider
//!
//! The control plane resolves an index name to its data-plane host; all
//! record traffic then goes straight to that host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::http::HttpClient;
use crate::providers::vector_store::VectorStoreProvider;
use crate::types::{IndexStats, SearchMatch, VectorRecord};

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2024-07";

/// Largest upsert request the data plane accepts
const MAX_UPSERT_BATCH: usize = 100;

/// A connected Pinecone index
pub struct PineconeIndex {
    http: HttpClient,
    api_key: String,
    index_name: String,
    host: String,
    dimension: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeIndex {
    /// Connect to an index whose data-plane host is already known
    pub fn with_host(
        http: HttpClient,
        api_key: String,
        index_name: String,
        host: &str,
    ) -> Self {
        Self {
            http,
            api_key,
            index_name,
            host: normalize_host(host),
            dimension: None,
        }
    }

    /// Connect using config, resolving the host through the control plane
    /// unless `PINECONE_INDEX_HOST` is set
    pub async fn connect(config: &RagConfig, http: HttpClient) -> Result<Self> {
        let (api_key, index_name) = config.require_pinecone()?;

        if let Some(host) = &config.vector_db.index_host {
            tracing::debug!("Using configured Pinecone host: {}", host);
            return Ok(Self::with_host(
                http,
                api_key.to_string(),
                index_name.to_string(),
                host,
            ));
        }

        let url = format!("{}/indexes/{}", config.vector_db.control_url, index_name);
        let description: IndexDescription = http
            .send_json(|client| {
                client
                    .get(&url)
                    .header(API_KEY_HEADER, api_key)
                    .header(API_VERSION_HEADER, API_VERSION)
            })
            .await
            .map_err(|e| {
                Error::vector_store(format!(
                    "Failed to describe Pinecone index '{}': {}",
                    index_name, e
                ))
            })?;

        tracing::info!(
            "Connected to Pinecone index '{}' at {}",
            index_name,
            description.host
        );
        if let Some(dimension) = description.dimension {
            if dimension != config.embeddings.dimensions {
                tracing::warn!(
                    "Pinecone index '{}' has dimension {}, embeddings have {}",
                    index_name,
                    dimension,
                    config.embeddings.dimensions
                );
            }
        }

        let mut index = Self::with_host(
            http,
            api_key.to_string(),
            index_name.to_string(),
            &description.host,
        );
        index.dimension = description.dimension;
        Ok(index)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    async fn upsert_batch(&self, namespace: &str, batch: &[VectorRecord]) -> Result<usize> {
        let url = self.endpoint("vectors/upsert");
        let request = UpsertRequest {
            vectors: batch,
            namespace,
        };

        let response: UpsertResponse = self
            .http
            .send_json(|client| {
                client
                    .post(&url)
                    .header(API_KEY_HEADER, &self.api_key)
                    .header(API_VERSION_HEADER, API_VERSION)
                    .json(&request)
            })
            .await
            .map_err(|e| Error::vector_store(format!("Pinecone upsert failed: {}", e)))?;

        Ok(response.upserted_count)
    }
}

/// Keep only `namespace` in index-wide stats and recount the total
fn scope_to_namespace(mut stats: IndexStats, namespace: &str) -> IndexStats {
    let scoped = stats.namespaces.remove(namespace).unwrap_or_default();
    stats.total_vector_count = scoped.vector_count;
    stats.namespaces.clear();
    if scoped.vector_count > 0 {
        stats.namespaces.insert(namespace.to_string(), scoped);
    }
    stats
}

/// Pinecone reports hosts without a scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeIndex {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut written = 0;
        for batch in records.chunks(MAX_UPSERT_BATCH) {
            written += self.upsert_batch(namespace, batch).await?;
        }
        tracing::debug!(
            "Upserted {} records into {}/{}",
            written,
            self.index_name,
            namespace
        );
        Ok(written)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        let url = self.endpoint("query");
        let request = QueryRequest {
            namespace,
            vector,
            top_k,
            include_metadata,
            include_values: false,
        };

        let response: QueryResponse = self
            .http
            .send_json(|client| {
                client
                    .post(&url)
                    .header(API_KEY_HEADER, &self.api_key)
                    .header(API_VERSION_HEADER, API_VERSION)
                    .json(&request)
            })
            .await
            .map_err(|e| Error::search(format!("Pinecone query failed: {}", e)))?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| SearchMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn describe_stats(&self, namespace: Option<&str>) -> Result<IndexStats> {
        let url = self.endpoint("describe_index_stats");
        let request = Value::Object(Map::new());

        let mut stats: IndexStats = self
            .http
            .send_json(|client| {
                client
                    .post(&url)
                    .header(API_KEY_HEADER, &self.api_key)
                    .header(API_VERSION_HEADER, API_VERSION)
                    .json(&request)
            })
            .await
            .map_err(|e| Error::vector_store(format!("Pinecone stats failed: {}", e)))?;

        if stats.dimension.is_none() {
            stats.dimension = self.dimension;
        }
        Ok(match namespace {
            Some(namespace) => scope_to_namespace(stats, namespace),
            None => stats,
        })
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("docs-abc123.svc.us-east-1.pinecone.io"),
            "https://docs-abc123.svc.us-east-1.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn test_upsert_request_shape() {
        let mut metadata = Map::new();
        metadata.insert("text".to_string(), json!("Lepidopolis"));
        let records = vec![VectorRecord {
            id: "abc".to_string(),
            values: vec![0.5, 0.25],
            metadata,
        }];

        let value = serde_json::to_value(UpsertRequest {
            vectors: &records,
            namespace: "TEST-namespace",
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "vectors": [{
                    "id": "abc",
                    "values": [0.5, 0.25],
                    "metadata": {"text": "Lepidopolis"}
                }],
                "namespace": "TEST-namespace"
            })
        );
    }

    #[test]
    fn test_query_request_shape() {
        let value = serde_json::to_value(QueryRequest {
            namespace: "TEST-namespace",
            vector: &[1.0, 0.0],
            top_k: 5,
            include_metadata: true,
            include_values: false,
        })
        .unwrap();

        assert_eq!(value["topK"], json!(5));
        assert_eq!(value["includeMetadata"], json!(true));
        assert_eq!(value["includeValues"], json!(false));
    }

    #[test]
    fn test_query_response_without_metadata() {
        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                {"id": "a", "score": 0.91},
                {"id": "b", "score": 0.5, "metadata": {"text": "t"}}
            ],
            "namespace": "TEST-namespace"
        }))
        .unwrap();

        assert_eq!(response.matches.len(), 2);
        assert!(response.matches[0].metadata.is_none());
        assert_eq!(response.matches[1].score, 0.5);
    }

    #[test]
    fn test_empty_query_response() {
        let response: QueryResponse = serde_json::from_value(json!({"namespace": ""})).unwrap();
        assert!(response.matches.is_empty());
    }

    #[test]
    fn test_stats_scoped_to_one_namespace() {
        let stats: IndexStats = serde_json::from_value(json!({
            "namespaces": {
                "TEST-namespace": {"vectorCount": 12},
                "other": {"vectorCount": 30}
            },
            "dimension": 768,
            "totalVectorCount": 42
        }))
        .unwrap();

        let scoped = scope_to_namespace(stats.clone(), "TEST-namespace");
        assert_eq!(scoped.total_vector_count, 12);
        assert_eq!(scoped.namespace_count("TEST-namespace"), 12);
        assert_eq!(scoped.namespace_count("other"), 0);
        assert_eq!(scoped.dimension, Some(768));

        let missing = scope_to_namespace(stats, "absent");
        assert_eq!(missing.total_vector_count, 0);
        assert!(missing.namespaces.is_empty());
    }
}
