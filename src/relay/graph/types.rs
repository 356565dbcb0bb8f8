// SPDX-License-Identifier: MIT

//! Transition-table types

use std::fmt;
use std::sync::Arc;

use crate::relay::state::WorkflowState;

/// Reserved terminal marker; a transition to this name ends the run
pub const END: &str = "__end__";

/// Where a router sends the run next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    To(String),
    End,
}

impl Transition {
    pub fn to(name: impl Into<String>) -> Self {
        Self::To(name.into())
    }
}

/// A routing function: pure over the state it is given, no side effects
pub type Router = Arc<dyn Fn(&WorkflowState) -> Transition + Send + Sync>;

/// The single outgoing edge set of a step
#[derive(Clone)]
pub enum Edge {
    /// Always transition to the named step (or END)
    To(String),
    /// Evaluate the router against the post-merge state; it may only return
    /// one of the declared targets
    Route { targets: Vec<String>, decide: Router },
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::To(target) => f.debug_tuple("To").field(target).finish(),
            Edge::Route { targets, .. } => {
                f.debug_struct("Route").field("targets", targets).finish()
            }
        }
    }
}

impl Edge {
    /// Every name this edge can transition to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::To(target) => vec![target.as_str()],
            Edge::Route { targets, .. } => targets.iter().map(|t| t.as_str()).collect(),
        }
    }
}
