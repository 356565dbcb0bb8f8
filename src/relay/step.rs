// SPDX-License-Identifier: MIT

//! The step contract and the per-run context handed to every step

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::emitter::ProgressEmitter;
use super::state::{StateUpdate, WorkflowState};

/// A named, stateless unit of work.
///
/// Steps read the current state and return only the fields they changed;
/// they never hold a mutable reference into the engine's canonical copy.
/// A step may await external services; its boundary is the unit of
/// suspension for the run.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, Box<dyn Error + Send + Sync>>;
}

/// Cooperative cancellation handle; checked by the engine between steps
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Per-run context: identity, cancellation, and the optional progress
/// side channel
pub struct RunContext {
    run_id: String,
    cancel: CancelFlag,
    emitter: Option<Arc<dyn ProgressEmitter>>,
}

impl RunContext {
    /// Context with a fresh run id and no observer
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4().to_string())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            cancel: CancelFlag::new(),
            emitter: None,
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn ProgressEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Handle the caller keeps to cancel the run between steps
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Publish a status message; no-op without an observer
    pub fn emit_status(&self, text: &str) {
        if let Some(emitter) = &self.emitter {
            emitter.emit_status(text);
        }
    }

    /// Publish a structured snapshot; no-op without an observer
    pub fn emit_snapshot(&self, fields: Value) {
        if let Some(emitter) = &self.emitter {
            emitter.emit_snapshot(fields);
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cancel_flag_shared_across_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());

        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_context_generates_run_id() {
        let ctx = RunContext::new();
        assert!(!ctx.run_id().is_empty());

        let other = RunContext::new();
        assert_ne!(ctx.run_id(), other.run_id());
    }

    #[test]
    fn test_emit_without_observer_is_noop() {
        let ctx = RunContext::with_run_id("r1");
        ctx.emit_status("working");
        ctx.emit_snapshot(json!({"needs_search": false}));
    }
}
