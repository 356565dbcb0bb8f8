// SPDX-License-Identifier: MIT

//! Mistral client - chat completions API

use super::{chat_completion_text, TextGenerator};
use crate::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;

const PROVIDER: &str = "mistral";
const DEFAULT_MODEL: &str = "mistral-large-latest";

/// Mistral chat-completions client, the direct-answer backend
pub struct MistralChat {
    client: Client,
    api_key: String,
    model_name: String,
}

impl MistralChat {
    /// Create a new MistralChat
    ///
    /// Requires `MISTRAL_API_KEY` to be set. `MISTRAL_MODEL` overrides the
    /// default model.
    pub fn new() -> Result<Self, ModelError> {
        let api_key = env::var("MISTRAL_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("MISTRAL_API_KEY".into()))?;
        let model_name = env::var("MISTRAL_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
        })
    }
}

#[async_trait]
impl TextGenerator for MistralChat {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let body = json!({
            "model": self.model_name,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let resp = self
            .client
            .post("https://api.mistral.ai/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(ModelError::api(PROVIDER, text));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("Mistral response: {}", resp_json);

        chat_completion_text(PROVIDER, &resp_json)
    }
}
