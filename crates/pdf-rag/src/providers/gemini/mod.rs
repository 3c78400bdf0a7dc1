//! Google Generative Language API providers
//!
//! - text-embedding-004 for embeddings
//! - gemini-2.0-flash for answer generation
//! - model listing for diagnostics

mod client;
mod embedder;
mod models;

pub use client::GeminiClient;
pub use embedder::GeminiEmbedder;
pub use models::{GeminiModels, ModelInfo};

use serde::{Deserialize, Serialize};

/// Header carrying the API key, keeping it out of request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

/// `{base}/v1beta/models/{model}:{method}`
fn model_endpoint(base_url: &str, model: &str, method: &str) -> String {
    format!("{}/v1beta/models/{}:{}", base_url, model, method)
}
