// SPDX-License-Identifier: MIT

//! State management for workflow runs
//!
//! This module provides:
//! - `StateSchema` - declares the extension fields, their types and merge
//!   policies, resolved at graph construction
//! - `WorkflowState` - the canonical state threaded through a run
//! - `StateUpdate` - the partial update a step returns

mod schema;
mod store;

pub use schema::{FieldDef, FieldType, MergePolicy, StateSchema};
pub use store::{Message, Role, StateUpdate, WorkflowState};
