// SPDX-License-Identifier: MIT

//! Step registry: name to executable step, unique names enforced
//!
//! Registration ends when the graph is compiled, after which the registry is
//! read-only; no interior locking is needed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GraphError;

use super::step::Step;

#[derive(Default)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under its name; duplicate names are rejected
    pub fn register(&mut self, step: Arc<dyn Step>) -> Result<(), GraphError> {
        let name = step.name().to_string();
        if self.steps.contains_key(&name) {
            return Err(GraphError::DuplicateStep(name));
        }
        self.steps.insert(name, step);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Step>> {
        self.steps.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
