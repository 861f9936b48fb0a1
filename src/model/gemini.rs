// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{Content, GenerationConfig, Model, Part};
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PROVIDER: &str = "Gemini";

/// Google Gemini model implementation
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model_name, self.api_key
        )
    }
}

/// Build the `generateContent` request body.
///
/// System messages become `systemInstruction`; assistant turns use the
/// `model` role.
pub fn build_request_body(history: &[Content], config: Option<&GenerationConfig>) -> Value {
    let system_text: Vec<String> = history
        .iter()
        .filter(|c| c.role == "system")
        .map(|c| c.text())
        .collect();

    let contents: Vec<Value> = history
        .iter()
        .filter(|c| c.role != "system")
        .map(|c| {
            let role = match c.role.as_str() {
                "assistant" | "model" => "model",
                _ => "user",
            };
            let parts: Vec<Value> = c
                .parts
                .iter()
                .filter_map(|p| match p {
                    Part::Text(t) => Some(json!({ "text": t })),
                    Part::Thinking(_) => None,
                })
                .collect();
            json!({ "role": role, "parts": parts })
        })
        .collect();

    let mut body = json!({ "contents": contents });

    if !system_text.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system_text.join("\n\n") }] });
    }

    if let Some(config) = config {
        let mut generation = serde_json::Map::new();
        if let Some(t) = config.temperature {
            generation.insert("temperature".into(), json!(t));
        }
        if let Some(m) = config.max_output_tokens {
            generation.insert("maxOutputTokens".into(), json!(m));
        }
        if let Some(p) = config.top_p {
            generation.insert("topP".into(), json!(p));
        }
        if let Some(k) = config.top_k {
            generation.insert("topK".into(), json!(k));
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }
    }

    body
}

/// Extract the first candidate's content from a response body
pub fn parse_response(resp_json: &Value) -> Result<Content, ServiceError> {
    let candidate = resp_json["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| ServiceError::InvalidResponse("no candidates in response".into()))?;

    if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
        log::debug!("Gemini finish reason: {}", finish_reason);
        if finish_reason == "SAFETY" {
            return Err(ServiceError::InvalidResponse(
                "response blocked by safety filters".into(),
            ));
        }
    }

    let parts_json = candidate["content"]["parts"].as_array().ok_or_else(|| {
        ServiceError::InvalidResponse(format!("no content parts in candidate: {}", candidate))
    })?;

    let parts: Vec<Part> = parts_json
        .iter()
        .filter_map(|p| {
            let text = p["text"].as_str()?.to_string();
            if p.get("thought").and_then(|t| t.as_bool()) == Some(true) {
                Some(Part::Thinking(text))
            } else {
                Some(Part::Text(text))
            }
        })
        .collect();

    if !parts.iter().any(|p| matches!(p, Part::Text(_))) {
        return Err(ServiceError::InvalidResponse(
            "candidate carries no text".into(),
        ));
    }

    Ok(Content {
        role: "model".to_string(),
        parts,
    })
}

#[async_trait]
impl Model for GeminiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ServiceError> {
        let body = build_request_body(history, config);

        log::debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self.client.post(self.endpoint()).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(ServiceError::api(PROVIDER, format!("{}: {}", status, text)));
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("Gemini response: {}", resp_json);

        parse_response(&resp_json)
    }
}
