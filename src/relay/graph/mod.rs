// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! A graph is assembled with [`GraphBuilder`], validated and frozen by
//! `compile()`, and executed by [`Workflow`].

pub mod builder;
pub mod executor;
pub mod types;

pub use builder::GraphBuilder;
pub use executor::Workflow;
pub use types::{Edge, Router, Transition, END};
