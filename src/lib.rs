// SPDX-License-Identifier: MIT

//! relay-rs routes a user query through one of several processing paths
//! chosen at runtime by a classification step, and persists the resulting
//! conversation state.
//!
//! The crate splits into two layers:
//! - [`llm`] - capability traits for text generation/classification and the
//!   concrete model backends implementing them
//! - [`relay`] - the workflow engine (state, graph, checkpointing, progress
//!   side channel), the concrete query-routing workflow, and the HTTP server

pub mod error;
pub mod llm;
pub mod relay;
