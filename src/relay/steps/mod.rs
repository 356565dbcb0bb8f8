// SPDX-License-Identifier: MIT

//! Concrete steps of the query-routing workflow

mod answer;
mod classify;
mod intake;

pub use answer::AnswerStep;
pub use classify::ClassifyStep;
pub use intake::IntakeStep;

/// Extension field set by the classification step and read by the router
pub const NEEDS_SEARCH: &str = "needs_search";

/// Extension field carrying the human-readable phase label
pub const STATUS: &str = "status";
