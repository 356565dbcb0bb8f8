// SPDX-License-Identifier: MIT

//! Groq client - OpenAI-compatible chat completions API

use super::{chat_completion_text, parse_classification, Classification, TextClassifier, TextGenerator};
use crate::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;

const PROVIDER: &str = "groq";
const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Groq chat-completions client.
///
/// Serves as the classification backend; deterministic output is wanted, so
/// requests go out with temperature 0.
pub struct GroqChat {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GroqChat {
    /// Create a new GroqChat
    ///
    /// Requires `GROQ_API_KEY` to be set. `GROQ_MODEL` overrides the default
    /// model, `GROQ_BASE_URL` the endpoint.
    pub fn new() -> Result<Self, ModelError> {
        let api_key =
            env::var("GROQ_API_KEY").map_err(|_| ModelError::ApiKeyMissing("GROQ_API_KEY".into()))?;
        let model_name = env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = env::var("GROQ_BASE_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url,
        })
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model_name,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(ModelError::api(PROVIDER, text));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("Groq response: {}", resp_json);

        chat_completion_text(PROVIDER, &resp_json)
    }
}

#[async_trait]
impl TextGenerator for GroqChat {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError> {
        self.chat(system, user).await
    }
}

#[async_trait]
impl TextClassifier for GroqChat {
    async fn classify(&self, system: &str, user: &str) -> Result<Classification, ModelError> {
        let text = self.chat(system, user).await?;
        parse_classification(PROVIDER, &text)
    }
}
