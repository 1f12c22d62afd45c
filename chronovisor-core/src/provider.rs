use crate::{Config, credential::ApiKeySlot, provider::gemini::GeminiClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod gemini;

/// A text generation request with a JSON-constrained response.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub model: String,
    pub system_instruction: String,
    pub contents: String,
    /// Response schema in the model's OpenAPI subset (`{"type": "OBJECT", ...}`).
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub image_size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// One content part of the first response candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

impl ResponsePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type: mime_type.into(), data: data.into() }),
        }
    }
}

/// The generative backend: one text call, one image call.
#[async_trait]
pub trait GenerativeModel: Send + Sync + Debug {
    /// Returns the raw text of the response, expected to be JSON matching the schema.
    async fn generate_text(&self, request: &TextRequest) -> anyhow::Result<String>;

    /// Returns the content parts of the first candidate.
    async fn generate_image(&self, request: &ImageRequest) -> anyhow::Result<Vec<ResponsePart>>;
}

/// Construct the live model from config. The key is read from `key` on every request.
pub fn model_from_config(config: &Config, key: ApiKeySlot) -> Box<dyn GenerativeModel> {
    Box::new(GeminiClient::new(config.models.endpoint.clone(), key))
}
