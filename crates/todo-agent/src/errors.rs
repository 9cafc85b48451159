use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures of a single tool call. These never end a turn: they are handed back
/// to the model as a failed tool response so it can adapt.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool call timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures that abort a user turn and are surfaced to the caller.
/// The conversation keeps everything appended before the failure.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Model invocation failed: {0:#}")]
    ModelInvocation(anyhow::Error),

    #[error("Model call timed out after {0:?}")]
    ModelTimeout(Duration),

    #[error("Exceeded the limit of {max_rounds} tool dispatch rounds")]
    LoopBudgetExceeded { max_rounds: usize },

    #[error("Turn cancelled")]
    Cancelled,
}

impl TurnError {
    /// Whether the error came from the model service, including timeouts
    pub fn is_model_failure(&self) -> bool {
        matches!(self, TurnError::ModelInvocation(_) | TurnError::ModelTimeout(_))
    }
}
