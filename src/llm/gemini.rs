// SPDX-License-Identifier: MIT

//! Gemini client - Google's generateContent API with search grounding

use super::TextGenerator;
use crate::error::ModelError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

const PROVIDER: &str = "gemini";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Tool declaration that attaches Google Search grounding to every request
static SEARCH_TOOL: Lazy<Value> = Lazy::new(|| json!([{ "google_search": {} }]));

/// Gemini client with the `google_search` tool attached, the search-capable
/// answer backend
pub struct GeminiSearch {
    client: Client,
    api_key: String,
    model_name: String,
}

impl GeminiSearch {
    /// Create a new GeminiSearch
    ///
    /// Requires `GOOGLE_API_KEY` to be set. `GEMINI_MODEL` overrides the
    /// default model.
    pub fn new() -> Result<Self, ModelError> {
        let api_key = env::var("GOOGLE_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("GOOGLE_API_KEY".into()))?;
        let model_name = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiSearch {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model_name, self.api_key
        );

        let body = json!({
            "system_instruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": user }] }],
            "tools": SEARCH_TOOL.clone()
        });

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(ModelError::api(PROVIDER, text));
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("Gemini response: {}", resp_json);

        candidate_text(&resp_json)
    }
}

/// Extract the concatenated text parts of the first candidate
fn candidate_text(resp: &Value) -> Result<String, ModelError> {
    let candidate = resp["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| ModelError::invalid_response(PROVIDER, "no candidates in response"))?;

    if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
        if finish_reason == "SAFETY" {
            return Err(ModelError::api(
                PROVIDER,
                "response blocked by safety filters",
            ));
        }
    }

    let parts = candidate["content"]["parts"]
        .as_array()
        .ok_or_else(|| ModelError::invalid_response(PROVIDER, "no parts in candidate content"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(ModelError::invalid_response(
            PROVIDER,
            "candidate contains no text parts",
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text() {
        let resp = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Sunny, " }, { "text": "24C" }] }
            }]
        });
        assert_eq!(candidate_text(&resp).unwrap(), "Sunny, 24C");
    }

    #[test]
    fn test_candidate_text_no_candidates() {
        let resp = json!({ "promptFeedback": {} });
        assert!(matches!(
            candidate_text(&resp),
            Err(ModelError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_candidate_text_safety_block() {
        let resp = json!({
            "candidates": [{ "finishReason": "SAFETY", "content": { "parts": [] } }]
        });
        assert!(matches!(candidate_text(&resp), Err(ModelError::Api { .. })));
    }

    #[test]
    fn test_candidate_text_empty_parts() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [] } }]
        });
        assert!(matches!(
            candidate_text(&resp),
            Err(ModelError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_search_tool_shape() {
        assert!(SEARCH_TOOL[0].get("google_search").is_some());
    }
}
