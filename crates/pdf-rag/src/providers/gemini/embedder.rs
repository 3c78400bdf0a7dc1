//! Gemini embedding provider using text-embedding-004

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{model_endpoint, Content, API_KEY_HEADER};
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::http::HttpClient;

/// The API accepts at most 100 requests per batch call
const MAX_BATCH: usize = 100;

/// Gemini embedding provider
pub struct GeminiEmbedder {
    http: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder
    pub fn new(
        http: HttpClient,
        api_key: String,
        base_url: String,
        model: String,
        dimensions: usize,
    ) -> Self {
        Self {
            http,
            api_key,
            base_url,
            model,
            dimensions,
        }
    }

    /// Create from config
    pub fn from_config(config: &RagConfig, http: HttpClient) -> Result<Self> {
        Ok(Self::new(
            http,
            config.require_gemini_key()?.to_string(),
            config.gemini.base_url.clone(),
            config.embeddings.model.clone(),
            config.embeddings.dimensions,
        ))
    }

    fn request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content::text(None, text),
            output_dimensionality: Some(self.dimensions),
        }
    }

    /// Reject vectors from a different space than the one configured
    fn check_dimensions(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.model,
                values.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = model_endpoint(&self.base_url, &self.model, "embedContent");
        let request = self.request(text);

        let response: EmbedContentResponse = self
            .http
            .send_json(|client| {
                client
                    .post(&url)
                    .header(API_KEY_HEADER, &self.api_key)
                    .json(&request)
            })
            .await
            .map_err(|e| Error::embedding(format!("Gemini embedding failed: {}", e)))?;

        self.check_dimensions(&response.embedding.values)?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = model_endpoint(&self.base_url, &self.model, "batchEmbedContents");
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            let request = BatchEmbedContentsRequest {
                requests: batch.iter().map(|t| self.request(t)).collect(),
            };

            let response: BatchEmbedContentsResponse = self
                .http
                .send_json(|client| {
                    client
                        .post(&url)
                        .header(API_KEY_HEADER, &self.api_key)
                        .json(&request)
                })
                .await
                .map_err(|e| Error::embedding(format!("Gemini batch embedding failed: {}", e)))?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }

            for embedding in response.embeddings {
                self.check_dimensions(&embedding.values)?;
                all_embeddings.push(embedding.values);
            }
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use serde_json::json;

    fn embedder() -> GeminiEmbedder {
        GeminiEmbedder::new(
            HttpClient::new(&HttpConfig::default()).unwrap(),
            "key".to_string(),
            "https://generativelanguage.googleapis.com".to_string(),
            "text-embedding-004".to_string(),
            3,
        )
    }

    #[test]
    fn test_request_shape() {
        let request = embedder().request("hello");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "hello"}]},
                "outputDimensionality": 3
            })
        );
    }

    #[test]
    fn test_batch_response_parsing() {
        let response: BatchEmbedContentsResponse = serde_json::from_value(json!({
            "embeddings": [{"values": [0.1, 0.2, 0.3]}, {"values": [0.4, 0.5, 0.6]}]
        }))
        .unwrap();

        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[1].values, vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_dimension_check() {
        let embedder = embedder();
        assert!(embedder.check_dimensions(&[0.0, 0.0, 0.0]).is_ok());
        assert!(matches!(
            embedder.check_dimensions(&[0.0; 768]),
            Err(Error::Embedding(_))
        ));
    }
}
