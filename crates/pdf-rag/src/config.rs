//! Configuration for the RAG pipeline
//!
//! Everything is read from environment-style variables once at startup and
//! then shared read-only between the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Main RAG configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Gemini API access (embeddings and generation)
    pub gemini: GeminiConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Generative model configuration
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Ingestion source
    pub ingestion: IngestionConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// Gemini API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (GEMINI_API_KEY)
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

/// Embedding configuration
///
/// Ingestion and query both embed through this section, so they always agree
/// on model and dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model identifier without the `models/` prefix
    pub model: String,
    /// Embedding dimensions (768 for text-embedding-004)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-004".to_string(),
            dimensions: 768,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier without the `models/` prefix
    pub model: String,
    /// Sampling temperature (model default when unset)
    pub temperature: Option<f32>,
    /// Output token cap (model default when unset)
    pub max_output_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Which index implementation to use
    #[serde(default)]
    pub backend: VectorBackend,
    /// Pinecone API key (PINECONE_API_KEY)
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Pinecone index name
    pub index_name: Option<String>,
    /// Data-plane host; resolved through the control plane when unset
    pub index_host: Option<String>,
    /// Pinecone control-plane URL
    pub control_url: String,
    /// Namespace isolating this document collection
    pub namespace: String,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            api_key: None,
            index_name: None,
            index_host: None,
            control_url: "https://api.pinecone.io".to_string(),
            namespace: "TEST-namespace".to_string(),
        }
    }
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Hosted Pinecone index
    #[default]
    Pinecone,
    /// In-process index, lives as long as the process
    Memory,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown vector backend '{}' (use pinecone or memory)", other)),
        }
    }
}

/// Ingestion source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// PDF to ingest
    pub pdf_path: PathBuf,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from("./sample.pdf"),
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Maximum embed+upsert batches in flight
    pub max_concurrency: usize,
    /// Chunks per embed+upsert batch
    pub upsert_batch_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            upsert_batch_size: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of matches requested per question
    pub top_k: usize,
    /// Score floor applied by the in-process backend
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures (transport, 429, 5xx)
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl RagConfig {
    /// Build configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unset or blank variables keep their defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Self::default();

        config.gemini.api_key = env.string("GEMINI_API_KEY");
        if let Some(url) = env.string("GEMINI_BASE_URL") {
            config.gemini.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(model) = env.string("EMBEDDING_MODEL") {
            config.embeddings.model = normalize_model_id(&model);
        }
        if let Some(dimensions) = env.parse("EMBEDDING_DIMENSIONS")? {
            config.embeddings.dimensions = dimensions;
        }

        if let Some(model) = env.string("CHAT_MODEL") {
            config.llm.model = normalize_model_id(&model);
        }
        config.llm.temperature = env.parse("CHAT_TEMPERATURE")?;
        config.llm.max_output_tokens = env.parse("CHAT_MAX_OUTPUT_TOKENS")?;

        if let Some(backend) = env.parse("VECTOR_BACKEND")? {
            config.vector_db.backend = backend;
        }
        config.vector_db.api_key = env.string("PINECONE_API_KEY");
        config.vector_db.index_name = env.string("PINECONE_INDEX_NAME");
        config.vector_db.index_host = env.string("PINECONE_INDEX_HOST");
        if let Some(url) = env.string("PINECONE_CONTROL_URL") {
            config.vector_db.control_url = url.trim_end_matches('/').to_string();
        }
        if let Some(namespace) = env.string("PINECONE_NAMESPACE") {
            config.vector_db.namespace = namespace;
        }

        if let Some(path) = env.string("PDF_PATH") {
            config.ingestion.pdf_path = PathBuf::from(path);
        }

        if let Some(size) = env.parse("CHUNK_SIZE")? {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = env.parse("CHUNK_OVERLAP")? {
            config.chunking.chunk_overlap = overlap;
        }

        if let Some(concurrency) = env.parse("MAX_CONCURRENCY")? {
            config.processing.max_concurrency = concurrency;
        }
        if let Some(batch) = env.parse("UPSERT_BATCH_SIZE")? {
            config.processing.upsert_batch_size = batch;
        }

        if let Some(top_k) = env.parse("TOP_K")? {
            config.retrieval.top_k = top_k;
        }
        config.retrieval.min_score = env.parse("MIN_SCORE")?;

        if let Some(timeout) = env.parse("REQUEST_TIMEOUT_SECS")? {
            config.http.timeout_secs = timeout;
        }
        if let Some(retries) = env.parse("MAX_RETRIES")? {
            config.http.max_retries = retries;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check numeric parameters
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Split("CHUNK_SIZE must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Split(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("EMBEDDING_DIMENSIONS must be greater than 0"));
        }
        if self.processing.max_concurrency == 0 {
            return Err(Error::config("MAX_CONCURRENCY must be at least 1"));
        }
        if self.processing.upsert_batch_size == 0 {
            return Err(Error::config("UPSERT_BATCH_SIZE must be at least 1"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("TOP_K must be at least 1"));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::config("REQUEST_TIMEOUT_SECS must be at least 1"));
        }
        Ok(())
    }

    /// Gemini API key, required for any embedding or generation call
    pub fn require_gemini_key(&self) -> Result<&str> {
        self.gemini
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config("GEMINI_API_KEY must be set"))
    }

    /// Pinecone credentials, required when the backend is `pinecone`
    pub fn require_pinecone(&self) -> Result<(&str, &str)> {
        let api_key = self
            .vector_db
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config("PINECONE_API_KEY must be set"))?;
        let index_name = self
            .vector_db
            .index_name
            .as_deref()
            .ok_or_else(|| Error::config("PINECONE_INDEX_NAME must be set"))?;
        Ok((api_key, index_name))
    }
}

/// Strip the `models/` resource prefix so both spellings name the same model
pub fn normalize_model_id(model: &str) -> String {
    model
        .trim()
        .trim_start_matches("models/")
        .to_string()
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.string(key) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| Error::config(format!("invalid {} '{}': {}", key, raw, e))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.processing.max_concurrency, 5);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.vector_db.namespace, "TEST-namespace");
        assert_eq!(config.embeddings.model, "text-embedding-004");
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.vector_db.backend, VectorBackend::Pinecone);
    }

    #[test]
    fn test_overrides_and_model_normalization() {
        let config = RagConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("EMBEDDING_MODEL", "models/text-embedding-004"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("TOP_K", "3"),
            ("VECTOR_BACKEND", "Memory"),
            ("PINECONE_NAMESPACE", "docs"),
            ("GEMINI_BASE_URL", "http://localhost:9000/"),
        ]))
        .unwrap();

        assert_eq!(config.require_gemini_key().unwrap(), "g-key");
        assert_eq!(config.embeddings.model, "text-embedding-004");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
        assert_eq!(config.vector_db.namespace, "docs");
        assert_eq!(config.gemini.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = RagConfig::from_lookup(lookup(&[("CHUNK_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = RagConfig::from_lookup(lookup(&[("MAX_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = RagConfig::from_lookup(lookup(&[("VECTOR_BACKEND", "faiss")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_chunk_parameters_are_split_errors() {
        let overlapping = lookup(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]);
        let err = RagConfig::from_lookup(overlapping).unwrap_err();
        assert!(matches!(err, Error::Split(_)));

        let err = RagConfig::from_lookup(lookup(&[("CHUNK_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, Error::Split(_)));

        assert!(RagConfig::from_lookup(lookup(&[("CHUNK_OVERLAP", "0")])).is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let config = RagConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.require_gemini_key().is_err());
        assert!(config.require_pinecone().is_err());

        let config = RagConfig::from_lookup(lookup(&[
            ("PINECONE_API_KEY", "p-key"),
            ("PINECONE_INDEX_NAME", "docs-index"),
        ]))
        .unwrap();
        assert_eq!(config.require_pinecone().unwrap(), ("p-key", "docs-index"));
    }
}
