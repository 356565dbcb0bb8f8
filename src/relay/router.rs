// SPDX-License-Identifier: MIT

//! The query-routing workflow
//!
//! `intake -> classify -> (route) -> {search | answer} -> END`
//!
//! A classification step decides whether the query needs live web data; the
//! router sends it to the search-grounded backend when it does, the direct
//! backend when it does not. Both branches append one assistant turn.

use std::sync::Arc;

use crate::error::{GraphError, RelayError};
use crate::llm::gemini::GeminiSearch;
use crate::llm::groq::GroqChat;
use crate::llm::mistral::MistralChat;
use crate::llm::{TextClassifier, TextGenerator};
use crate::relay::checkpoint::CheckpointStore;
use crate::relay::graph::{GraphBuilder, Transition, Workflow, END};
use crate::relay::state::{FieldType, MergePolicy, StateSchema};
use crate::relay::steps::{AnswerStep, ClassifyStep, IntakeStep, NEEDS_SEARCH, STATUS};

pub const INTAKE: &str = "intake";
pub const CLASSIFY: &str = "classify";
pub const SEARCH: &str = "search";
pub const ANSWER: &str = "answer";

const DIRECT_INSTRUCTION: &str =
    "You are a helpful assistant that can answer the given user query with the best of your knowledge";
const SEARCH_INSTRUCTION: &str = "Use search to fetch current information.";

/// Extension-field schema of the workflow
pub fn conversation_schema() -> StateSchema {
    StateSchema::new()
        .field(
            NEEDS_SEARCH,
            FieldType::Boolean,
            MergePolicy::ReplaceIfPresent,
            Some(serde_json::json!(false)),
        )
        .field(STATUS, FieldType::String, MergePolicy::ReplaceIfPresent, None)
}

/// Assemble the workflow graph over the given backends
pub fn build_workflow(
    classifier: Arc<dyn TextClassifier>,
    direct: Arc<dyn TextGenerator>,
    search: Arc<dyn TextGenerator>,
    store: Arc<dyn CheckpointStore>,
) -> Result<Workflow, GraphError> {
    GraphBuilder::new("query-router")
        .schema(conversation_schema())
        .add_step(Arc::new(IntakeStep::new()))
        .add_step(Arc::new(ClassifyStep::new(classifier)))
        .add_step(Arc::new(AnswerStep::new(SEARCH, SEARCH_INSTRUCTION, search)))
        .add_step(Arc::new(AnswerStep::new(ANSWER, DIRECT_INSTRUCTION, direct)))
        .add_edge(INTAKE, CLASSIFY)
        .add_router(CLASSIFY, [SEARCH, ANSWER], |state| {
            if state.bool_field(NEEDS_SEARCH).unwrap_or(false) {
                Transition::to(SEARCH)
            } else {
                Transition::to(ANSWER)
            }
        })
        .add_edge(SEARCH, END)
        .add_edge(ANSWER, END)
        .entry(INTAKE)
        .store(store)
        .compile()
}

/// Assemble the workflow over the production backends, configured from the
/// environment: Groq classifies, Mistral answers directly, Gemini answers
/// with search grounding
pub fn build_default_workflow(store: Arc<dyn CheckpointStore>) -> Result<Workflow, RelayError> {
    let classifier = Arc::new(GroqChat::new()?);
    let direct = Arc::new(MistralChat::new()?);
    let search = Arc::new(GeminiSearch::new()?);

    Ok(build_workflow(classifier, direct, search, store)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::llm::Classification;
    use crate::relay::checkpoint::MemoryCheckpointStore;
    use crate::relay::state::{Message, Role, StateUpdate};
    use crate::relay::step::RunContext;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedClassifier {
        verdict: Option<Classification>,
    }

    #[async_trait]
    impl TextClassifier for ScriptedClassifier {
        async fn classify(
            &self,
            _system: &str,
            _user: &str,
        ) -> Result<Classification, ModelError> {
            match &self.verdict {
                Some(v) => Ok(v.clone()),
                None => Err(ModelError::invalid_response("mock", "unparsable verdict")),
            }
        }
    }

    struct CountingBackend {
        provider: &'static str,
        reply: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl CountingBackend {
        fn new(provider: &'static str, reply: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    provider,
                    reply,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl TextGenerator for CountingBackend {
        fn provider(&self) -> &str {
            self.provider
        }

        async fn generate(&self, _system: &str, _user: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    fn workflow_with(
        verdict: Option<Classification>,
    ) -> (Workflow, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (direct, direct_calls) = CountingBackend::new("direct", "direct answer");
        let (search, search_calls) = CountingBackend::new("searching", "search answer");
        let workflow = build_workflow(
            Arc::new(ScriptedClassifier { verdict }),
            direct,
            search,
            Arc::new(MemoryCheckpointStore::new()),
        )
        .unwrap();
        (workflow, direct_calls, search_calls)
    }

    #[tokio::test]
    async fn test_no_search_query_routes_direct() {
        let (workflow, direct_calls, search_calls) = workflow_with(Some(Classification {
            needs_search: false,
            reason: None,
        }));

        let ctx = RunContext::new();
        let initial = StateUpdate::message(Message::user("What is 2+2?"));
        let final_state = workflow.run(initial, &ctx).await.unwrap();

        assert_eq!(direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(search_calls.load(Ordering::SeqCst), 0);

        // Exactly one assistant turn appended after the user turn
        assert_eq!(final_state.messages().len(), 2);
        assert_eq!(final_state.messages()[1].role, Role::Assistant);
        assert_eq!(final_state.messages()[1].content, "direct answer");
        assert_eq!(final_state.bool_field(NEEDS_SEARCH), Some(false));
    }

    #[tokio::test]
    async fn test_search_query_routes_through_search_backend() {
        let (workflow, direct_calls, search_calls) = workflow_with(Some(Classification {
            needs_search: true,
            reason: Some("live data".into()),
        }));

        let ctx = RunContext::new();
        let initial = StateUpdate::message(Message::user("What's today's weather in Paris?"));
        let final_state = workflow.run(initial, &ctx).await.unwrap();

        assert_eq!(search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(direct_calls.load(Ordering::SeqCst), 0);
        assert_eq!(final_state.last_assistant_text(), Some("search answer"));
        assert_eq!(final_state.bool_field(NEEDS_SEARCH), Some(true));
    }

    #[tokio::test]
    async fn test_unparsable_classification_falls_back_to_direct() {
        let (workflow, direct_calls, search_calls) = workflow_with(None);

        let ctx = RunContext::new();
        let initial = StateUpdate::message(Message::user("Who won yesterday's match?"));
        let final_state = workflow.run(initial, &ctx).await.unwrap();

        assert_eq!(direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(search_calls.load(Ordering::SeqCst), 0);
        assert_eq!(final_state.bool_field(NEEDS_SEARCH), Some(false));
    }

    #[tokio::test]
    async fn test_routing_is_deterministic_per_verdict() {
        // Same verdict, different conversations: always the same branch
        for query in ["hello", "weather now?", "write me a poem"] {
            let (workflow, _, search_calls) = workflow_with(Some(Classification {
                needs_search: true,
                reason: None,
            }));
            workflow
                .run(
                    StateUpdate::message(Message::user(query)),
                    &RunContext::new(),
                )
                .await
                .unwrap();
            assert_eq!(search_calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_checkpoints_cover_the_traversed_path() {
        let (workflow, _, _) = workflow_with(Some(Classification {
            needs_search: false,
            reason: None,
        }));

        let ctx = RunContext::new();
        workflow
            .run(StateUpdate::message(Message::user("hi")), &ctx)
            .await
            .unwrap();

        let steps: Vec<String> = workflow
            .store()
            .list(ctx.run_id())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.step)
            .collect();
        assert_eq!(steps, vec![INTAKE, CLASSIFY, ANSWER]);
    }
}
