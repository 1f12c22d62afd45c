use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::credential::ApiKeySlot;

use super::{GenerativeModel, ImageRequest, ResponsePart, TextRequest};

/// REST client for the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    endpoint: String,
    key: ApiKeySlot,
    http: Client,
}

impl GeminiClient {
    pub fn new(endpoint: String, key: ApiKeySlot) -> Self {
        Self { endpoint: endpoint.trim_end_matches('/').to_string(), key, http: Client::new() }
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.endpoint, model)
    }

    async fn generate(&self, model: &str, body: serde_json::Value) -> Result<GenerateResponse> {
        let api_key = self.key.get().ok_or_else(|| {
            anyhow!(
                "No API key available.\n\
                 Hint: run `chronovisor configure` or set GEMINI_API_KEY."
            )
        })?;

        debug!(model, "sending generateContent request");

        let res = self
            .http
            .post(self.url_for(model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to model '{model}'"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read response body from model '{model}'"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Model '{}' request failed with status {}: {}",
                model,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse response envelope from model '{model}'"))
    }
}

pub(crate) fn text_request_body(request: &TextRequest) -> serde_json::Value {
    json!({
        "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
        "contents": [{ "role": "user", "parts": [{ "text": request.contents }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        }
    })
}

pub(crate) fn image_request_body(request: &ImageRequest) -> serde_json::Value {
    json!({
        "contents": [{ "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "imageConfig": {
                "aspectRatio": request.aspect_ratio,
                "imageSize": request.image_size,
            }
        }
    })
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

impl GenerateResponse {
    fn into_first_parts(self) -> Vec<ResponsePart> {
        self.candidates.into_iter().next().map(|c| c.content.parts).unwrap_or_default()
    }

    /// Concatenated text of the first candidate.
    fn text(self) -> String {
        self.into_first_parts().into_iter().filter_map(|p| p.text).collect()
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String> {
        let response = self.generate(&request.model, text_request_body(request)).await?;
        Ok(response.text())
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<ResponsePart>> {
        let response = self.generate(&request.model, image_request_body(request)).await?;
        Ok(response.into_first_parts())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
