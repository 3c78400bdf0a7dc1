//! Model listing, used to check which models an API key can reach

use serde::Deserialize;

use super::API_KEY_HEADER;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::http::HttpClient;

/// A model visible to the API key
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-2.0-flash`
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model can embed text
    pub fn supports_embedding(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "embedContent")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// Lists available models
pub struct GeminiModels {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl GeminiModels {
    /// Create from config
    pub fn from_config(config: &RagConfig, http: HttpClient) -> Result<Self> {
        Ok(Self {
            http,
            api_key: config.require_gemini_key()?.to_string(),
            base_url: config.gemini.base_url.clone(),
        })
    }

    /// Fetch every page of the model list
    pub async fn list(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response: ListModelsResponse = self
                .http
                .send_json(|client| {
                    let mut request = client
                        .get(&url)
                        .header(API_KEY_HEADER, &self.api_key)
                        .query(&[("pageSize", "1000")]);
                    if let Some(token) = &page_token {
                        request = request.query(&[("pageToken", token.as_str())]);
                    }
                    request
                })
                .await
                .map_err(|e| Error::config(format!("Listing Gemini models failed: {}", e)))?;

            models.extend(response.models);

            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_response_parsing() {
        let response: ListModelsResponse = serde_json::from_value(json!({
            "models": [
                {
                    "name": "models/text-embedding-004",
                    "displayName": "Text Embedding 004",
                    "supportedGenerationMethods": ["embedContent"]
                },
                {
                    "name": "models/gemini-2.0-flash",
                    "supportedGenerationMethods": ["generateContent"]
                }
            ],
            "nextPageToken": "abc"
        }))
        .unwrap();

        assert_eq!(response.models.len(), 2);
        assert!(response.models[0].supports_embedding());
        assert!(!response.models[1].supports_embedding());
        assert_eq!(response.next_page_token.as_deref(), Some("abc"));
    }
}
