// SPDX-License-Identifier: MIT

//! Durable checkpointing of run state
//!
//! A checkpoint is written after every step, so a run can be resumed from
//! its latest snapshot or inspected mid-flight. The store is a trait object
//! injected at graph construction; the in-memory implementation keeps
//! checkpoints for the process lifetime, durable backends plug in behind
//! the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::state::WorkflowState;

/// Immutable snapshot of run state after one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    /// Monotonically increasing within a run
    pub sequence: u64,
    /// Name of the step whose update produced this snapshot
    pub step: String,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(run_id: &str, sequence: u64, step: &str, state: WorkflowState) -> Self {
        Self {
            run_id: run_id.to_string(),
            sequence,
            step: step.to_string(),
            state,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append a checkpoint under its run id
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// All checkpoints for a run, in sequence order
    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, Box<dyn Error + Send + Sync>>;

    /// The most recent checkpoint for a run
    async fn latest(
        &self,
        run_id: &str,
    ) -> Result<Option<Checkpoint>, Box<dyn Error + Send + Sync>>;
}

/// In-process store; runs under distinct ids never see each other's entries
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    runs: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut runs = self.runs.write().await;
        runs.entry(checkpoint.run_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, Box<dyn Error + Send + Sync>> {
        let runs = self.runs.read().await;
        Ok(runs.get(run_id).cloned().unwrap_or_default())
    }

    async fn latest(
        &self,
        run_id: &str,
    ) -> Result<Option<Checkpoint>, Box<dyn Error + Send + Sync>> {
        let runs = self.runs.read().await;
        Ok(runs.get(run_id).and_then(|c| c.last().cloned()))
    }
}
