//! Error types for process-control actions.

use thiserror::Error;

/// Result type alias for action invocations.
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors that can occur while invoking an external control action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid identifier {0:?}")]
    InvalidName(String),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed { command: String, status: String },
}
