// SPDX-License-Identifier: MIT

//! Model backends behind two capability traits.
//!
//! The engine and graph never depend on a specific provider; steps hold a
//! trait object for the single capability they need. Implementations are in
//! their own submodules:
//! - [gemini] - Google's Gemini API with search grounding
//! - [groq] - Groq's OpenAI-compatible chat completions
//! - [mistral] - Mistral's chat completions

pub mod gemini;
pub mod groq;
pub mod mistral;

use crate::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Produces free text from a system instruction and a user message
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider label used in logs and error messages
    fn provider(&self) -> &str;

    async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError>;
}

/// Classifies a user message into a structured search verdict
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Returns [`ModelError::InvalidResponse`] when the backend answered but
    /// the payload does not parse; callers decide whether that degrades or
    /// fails the run.
    async fn classify(&self, system: &str, user: &str) -> Result<Classification, ModelError>;
}

/// Structured verdict returned by the classification backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub needs_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Extract the assistant text from an OpenAI-style chat completion body
pub(crate) fn chat_completion_text(
    provider: &str,
    body: &serde_json::Value,
) -> Result<String, ModelError> {
    body["choices"]
        .as_array()
        .and_then(|c| c.first())
        .and_then(|c| c["message"]["content"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ModelError::invalid_response(provider, "no message content in choices"))
}

/// Parse a classification payload, tolerating markdown code fences around
/// the JSON object
pub(crate) fn parse_classification(provider: &str, text: &str) -> Result<Classification, ModelError> {
    let trimmed = strip_code_fence(text);
    serde_json::from_str::<Classification>(trimmed)
        .map_err(|e| ModelError::invalid_response(provider, format!("unparsable verdict: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence, then the closing fence
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}
