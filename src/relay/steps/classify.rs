// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;

use crate::error::ModelError;
use crate::llm::{Classification, TextClassifier};
use crate::relay::state::{StateUpdate, WorkflowState};
use crate::relay::step::{RunContext, Step};

use super::NEEDS_SEARCH;

const INSTRUCTION: &str = r#"Classify if the query requires real-time web data (SEARCH) or can be answered by training data (NO_SEARCH). Output ONLY JSON: {"needs_search": boolean, "reason": "string"}"#;

/// Classifies the latest user turn into search / no-search.
///
/// An unparsable verdict degrades to the no-search default instead of
/// failing the run; transport failures stay fatal.
pub struct ClassifyStep {
    classifier: Arc<dyn TextClassifier>,
}

impl ClassifyStep {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Step for ClassifyStep {
    fn name(&self) -> &str {
        "classify"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, Box<dyn Error + Send + Sync>> {
        let user = state.last_user_text().unwrap_or("");

        let verdict = match self.classifier.classify(INSTRUCTION, user).await {
            Ok(verdict) => verdict,
            Err(err @ ModelError::InvalidResponse { .. }) => {
                log::warn!(
                    "Run {} classification unparsable, defaulting to no-search: {}",
                    ctx.run_id(),
                    err
                );
                Classification::default()
            }
            Err(other) => return Err(other.into()),
        };

        let status = if verdict.needs_search {
            "Routing: SEARCH"
        } else {
            "Routing: NO_SEARCH"
        };
        ctx.emit_status(status);
        ctx.emit_snapshot(json!({
            "needs_search": verdict.needs_search,
            "reason": verdict.reason,
        }));

        Ok(StateUpdate::none().with_field(NEEDS_SEARCH, json!(verdict.needs_search)))
    }
}
