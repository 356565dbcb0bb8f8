// SPDX-License-Identifier: MIT

//! Typed error handling for relay-rs
//!
//! Three layers map to the three failure domains: [`GraphError`] for graph
//! construction, [`ExecutionError`] for a running workflow, [`ModelError`]
//! for the model backends. [`RelayError`] wraps them at the binary boundary.

use std::error::Error;
use thiserror::Error;

/// Top-level error type for relay-rs
#[derive(Debug, Error)]
pub enum RelayError {
    /// Graph construction errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Workflow execution errors
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Model backend errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

/// Errors detected while constructing a workflow graph.
///
/// All of these are build-time failures; a compiled workflow can no longer
/// produce them.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A step name was registered twice
    #[error("Duplicate step name: '{0}'")]
    DuplicateStep(String),

    /// No entry step was designated
    #[error("No entry step designated")]
    MissingEntry,

    /// The designated entry step is not registered
    #[error("Entry step '{0}' is not registered")]
    UnknownEntry(String),

    /// A registered step has no outgoing edge
    #[error("Step '{0}' has no outgoing edge")]
    MissingEdge(String),

    /// A step was given more than one outgoing edge set
    #[error("Step '{0}' already has an outgoing edge")]
    DuplicateEdge(String),

    /// An edge was declared from a step that is not registered
    #[error("Edge declared from unregistered step '{0}'")]
    UnknownSource(String),

    /// An edge points at a name that is neither a registered step nor END
    #[error("Edge from '{from}' targets unregistered step '{to}'")]
    UnknownTarget { from: String, to: String },

    /// A router was declared with no possible targets
    #[error("Router on step '{0}' declares no targets")]
    EmptyRouter(String),

    /// A registered step cannot be reached from the entry step
    #[error("Step '{0}' is unreachable from the entry step")]
    Unreachable(String),

    /// A reachable step has no path to the terminal marker
    #[error("Step '{0}' has no path to END")]
    NoPathToEnd(String),
}

/// Errors raised while a compiled workflow is running
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A step returned an error; fatal to the run
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// A step exceeded the configured deadline
    #[error("Step '{step}' timed out after {timeout_ms}ms")]
    StepTimeout { step: String, timeout_ms: u64 },

    /// A router returned a target outside its declared set
    #[error("Router on step '{step}' returned undeclared target '{target}'")]
    UndeclaredTarget { step: String, target: String },

    /// The run was cancelled between steps
    #[error("Run '{0}' was cancelled")]
    Cancelled(String),

    /// The step ceiling was exceeded (routing cycle backstop)
    #[error("Run exceeded the step ceiling of {0}")]
    StepCeiling(u32),

    /// The checkpoint store rejected a write or read
    #[error("Checkpoint store failure: {source}")]
    Checkpoint {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    /// Resume was requested for a run with no committed checkpoint
    #[error("No checkpoint recorded for run '{0}'")]
    NoCheckpoint(String),
}

/// Model backend errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("{0} must be set")]
    ApiKeyMissing(String),

    /// API-level error from an external service
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The backend answered, but the payload could not be interpreted.
    /// Callers may treat this class as degradable rather than fatal.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl RelayError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

// Allow conversion from &str for compatibility with boxed-error call sites
impl From<&str> for RelayError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for RelayError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<Box<dyn Error + Send + Sync>> for RelayError {
    fn from(err: Box<dyn Error + Send + Sync>) -> Self {
        Self::Other(err.to_string())
    }
}
