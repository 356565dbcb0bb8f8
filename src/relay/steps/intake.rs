// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::error::Error;

use crate::relay::state::{StateUpdate, WorkflowState};
use crate::relay::step::{RunContext, Step};

use super::STATUS;

const PHASE_LABEL: &str = "Classifying search intent";

/// First step of the run: announces the phase on the side channel and
/// records it in the status field. Sets nothing the router reads.
pub struct IntakeStep;

impl IntakeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IntakeStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Step for IntakeStep {
    fn name(&self) -> &str {
        "intake"
    }

    async fn run(
        &self,
        _state: &WorkflowState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, Box<dyn Error + Send + Sync>> {
        ctx.emit_status(PHASE_LABEL);
        Ok(StateUpdate::none().with_field(STATUS, json!(PHASE_LABEL)))
    }
}
