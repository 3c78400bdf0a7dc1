//! Gemini client for answer generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{model_endpoint, Content, Part, API_KEY_HEADER};
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::http::HttpClient;
use crate::providers::llm::LlmProvider;

/// Gemini generateContent client
pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(http: HttpClient, api_key: String, base_url: String, model: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
            model,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &RagConfig, http: HttpClient) -> Result<Self> {
        let mut client = Self::new(
            http,
            config.require_gemini_key()?.to_string(),
            config.gemini.base_url.clone(),
            config.llm.model.clone(),
        );
        client.temperature = config.llm.temperature;
        client.max_output_tokens = config.llm.max_output_tokens;
        Ok(client)
    }

    fn request(&self, prompt: &str) -> GenerateRequest {
        let generation_config = if self.temperature.is_some() || self.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    /// Text of the first candidate, all parts concatenated
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::generation("No candidates in Gemini response"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::generation(format!(
                "No text in Gemini response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = model_endpoint(&self.base_url, &self.model, "generateContent");
        let request = self.request(prompt);

        tracing::debug!("Generating answer with model: {}", self.model);

        let response: GenerateResponse = self
            .http
            .send_json(|client| {
                client
                    .post(&url)
                    .header(API_KEY_HEADER, &self.api_key)
                    .json(&request)
            })
            .await
            .map_err(|e| Error::generation(format!("Gemini request failed: {}", e)))?;

        response.into_text()
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

    fn client() -> GeminiClient {
        GeminiClient::new(
            HttpClient::new(&HttpConfig::default()).unwrap(),
            "key".to_string(),
            "https://generativelanguage.googleapis.com".to_string(),
            "gemini-2.0-flash".to_string(),
        )
    }

    #[test]
    fn test_request_without_generation_config() {
        let value = serde_json::to_value(client().request("Why?")).unwrap();
        assert_eq!(
            value,
            json!({"contents": [{"role": "user", "parts": [{"text": "Why?"}]}]})
        );
    }

    #[test]
    fn test_request_with_generation_config() {
        let mut client = client();
        client.temperature = Some(0.2);
        let value = serde_json::to_value(client.request("Why?")).unwrap();
        assert_eq!(value["generationConfig"], json!({"temperature": 0.2f32}));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Lepido"}, {"text": "polis."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response.into_text().unwrap(), "Lepidopolis.");
    }

    #[test]
    fn test_blocked_response_is_generation_error() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        let err = response.into_text().unwrap_err();
        assert!(matches!(err, Error::Generation(ref msg) if msg.contains("SAFETY")));

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_text().is_err());
    }
}
