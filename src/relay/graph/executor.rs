// SPDX-License-Identifier: MIT

//! Workflow executor
//!
//! Walks the transition table from the entry step: invoke, merge, checkpoint,
//! route, repeat until END. Routing is evaluated strictly after the producing
//! step's update has been merged, so a classification step's output is always
//! visible to the router that follows it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ExecutionError;
use crate::relay::checkpoint::{Checkpoint, CheckpointStore};
use crate::relay::registry::StepRegistry;
use crate::relay::state::{StateSchema, StateUpdate, WorkflowState};
use crate::relay::step::RunContext;

use super::types::{Edge, Transition, END};

/// A compiled, immutable workflow. Construct through
/// [`GraphBuilder`](super::GraphBuilder); cheap to share across concurrent
/// runs.
pub struct Workflow {
    name: String,
    schema: StateSchema,
    registry: StepRegistry,
    edges: HashMap<String, Edge>,
    entry: String,
    store: Arc<dyn CheckpointStore>,
    step_timeout: Option<Duration>,
    step_ceiling: u32,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("step_timeout", &self.step_timeout)
            .field("step_ceiling", &self.step_ceiling)
            .finish()
    }
}

impl Workflow {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        name: String,
        schema: StateSchema,
        registry: StepRegistry,
        edges: HashMap<String, Edge>,
        entry: String,
        store: Arc<dyn CheckpointStore>,
        step_timeout: Option<Duration>,
        step_ceiling: u32,
    ) -> Self {
        Self {
            name,
            schema,
            registry,
            edges,
            entry,
            store,
            step_timeout,
            step_ceiling,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> Arc<dyn CheckpointStore> {
        self.store.clone()
    }

    /// Execute the workflow to completion.
    ///
    /// `initial` is merged over the schema defaults before the entry step
    /// runs; at minimum it carries the conversation turns.
    pub async fn run(
        &self,
        initial: StateUpdate,
        ctx: &RunContext,
    ) -> Result<WorkflowState, ExecutionError> {
        let mut state = WorkflowState::new(&self.schema);
        state.merge(initial);

        log::info!("Run {} starting workflow '{}'", ctx.run_id(), self.name);
        self.drive(self.entry.clone(), state, 0, ctx).await
    }

    /// Continue a run from its latest checkpoint.
    ///
    /// The checkpointed step already completed and merged, so execution
    /// resumes at its outgoing transition, not by re-running it.
    pub async fn resume(&self, ctx: &RunContext) -> Result<WorkflowState, ExecutionError> {
        let latest = self
            .store
            .latest(ctx.run_id())
            .await
            .map_err(|source| ExecutionError::Checkpoint { source })?
            .ok_or_else(|| ExecutionError::NoCheckpoint(ctx.run_id().to_string()))?;

        log::info!(
            "Run {} resuming workflow '{}' after step '{}' (sequence {})",
            ctx.run_id(),
            self.name,
            latest.step,
            latest.sequence
        );

        let next = self.next_after(&latest.step, &latest.state)?;
        self.drive(next, latest.state, latest.sequence + 1, ctx).await
    }

    async fn drive(
        &self,
        mut current: String,
        mut state: WorkflowState,
        mut sequence: u64,
        ctx: &RunContext,
    ) -> Result<WorkflowState, ExecutionError> {
        let mut executed: u32 = 0;

        while current != END {
            if ctx.is_cancelled() {
                return Err(ExecutionError::Cancelled(ctx.run_id().to_string()));
            }
            executed += 1;
            if executed > self.step_ceiling {
                return Err(ExecutionError::StepCeiling(self.step_ceiling));
            }

            // Registered targets are validated at compile time; only a
            // router's runtime return can miss, and next_after rejects that
            let step = self
                .registry
                .get(&current)
                .expect("compiled graph resolves every step");

            log::info!("Run {} executing step '{}'", ctx.run_id(), current);

            let update = self.invoke(step.as_ref(), &current, &state, ctx).await?;
            state.merge(update);

            self.store
                .put(Checkpoint::new(ctx.run_id(), sequence, &current, state.clone()))
                .await
                .map_err(|source| ExecutionError::Checkpoint { source })?;
            sequence += 1;

            current = self.next_after(&current, &state)?;
        }

        log::info!(
            "Run {} completed workflow '{}' in {} steps",
            ctx.run_id(),
            self.name,
            executed
        );
        Ok(state)
    }

    async fn invoke(
        &self,
        step: &dyn crate::relay::step::Step,
        name: &str,
        state: &WorkflowState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, ExecutionError> {
        let fut = step.run(state, ctx);

        let result = match self.step_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut).await.map_err(|_| {
                ExecutionError::StepTimeout {
                    step: name.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }
            })?,
            None => fut.await,
        };

        result.map_err(|source| ExecutionError::Step {
            step: name.to_string(),
            source,
        })
    }

    fn next_after(&self, step: &str, state: &WorkflowState) -> Result<String, ExecutionError> {
        match self
            .edges
            .get(step)
            .expect("compiled graph has an edge per step")
        {
            Edge::To(target) => Ok(target.clone()),
            Edge::Route { targets, decide } => match decide(state) {
                Transition::End => Ok(END.to_string()),
                Transition::To(target) if targets.iter().any(|t| *t == target) => Ok(target),
                Transition::To(target) => Err(ExecutionError::UndeclaredTarget {
                    step: step.to_string(),
                    target,
                }),
            },
        }
    }
}
