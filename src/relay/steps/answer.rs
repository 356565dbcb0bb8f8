// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

use crate::llm::TextGenerator;
use crate::relay::state::{Message, StateUpdate, WorkflowState};
use crate::relay::step::{RunContext, Step};

/// Terminal step of either branch: sends the latest user turn to its backend
/// and appends exactly one assistant message. Which backend and instruction
/// it carries is decided at graph construction; the step itself is
/// backend-agnostic.
pub struct AnswerStep {
    name: String,
    instruction: String,
    backend: Arc<dyn TextGenerator>,
}

impl AnswerStep {
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        backend: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            backend,
        }
    }
}

#[async_trait]
impl Step for AnswerStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, Box<dyn Error + Send + Sync>> {
        let user = state.last_user_text().unwrap_or("");

        log::info!(
            "Run {} step '{}' querying {} backend",
            ctx.run_id(),
            self.name,
            self.backend.provider()
        );

        let text = self.backend.generate(&self.instruction, user).await?;
        Ok(StateUpdate::message(Message::assistant(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::relay::state::{Role, StateSchema};

    struct EchoBackend;

    #[async_trait]
    impl TextGenerator for EchoBackend {
        fn provider(&self) -> &str {
            "echo"
        }

        async fn generate(&self, system: &str, user: &str) -> Result<String, ModelError> {
            Ok(format!("{} :: {}", system, user))
        }
    }

    struct DownBackend;

    #[async_trait]
    impl TextGenerator for DownBackend {
        fn provider(&self) -> &str {
            "down"
        }

        async fn generate(&self, _system: &str, _user: &str) -> Result<String, ModelError> {
            Err(ModelError::api("down", "connection refused"))
        }
    }

    fn state_with(user: &str) -> WorkflowState {
        let mut state = WorkflowState::new(&StateSchema::new());
        state.merge(StateUpdate::message(Message::user(user)));
        state
    }

    #[tokio::test]
    async fn test_appends_one_assistant_turn() {
        let step = AnswerStep::new("answer", "be helpful", Arc::new(EchoBackend));
        let ctx = RunContext::with_run_id("r1");

        let update = step.run(&state_with("what is 2+2?"), &ctx).await.unwrap();

        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].role, Role::Assistant);
        assert_eq!(update.messages[0].content, "be helpful :: what is 2+2?");
        assert!(update.fields.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let step = AnswerStep::new("answer", "be helpful", Arc::new(DownBackend));
        let ctx = RunContext::with_run_id("r1");

        let err = step.run(&state_with("hi"), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
