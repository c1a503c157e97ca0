//! Execution error types.

use procflow_resolver::ResolveError;
use serde::{Deserialize, Serialize};

/// Errors that can occur while driving an activity execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
  /// Input, output or expression resolution failed.
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  /// A completion handle was used before `postpone`.
  #[error("execution '{execution_id}' is not postponed")]
  NotPostponed { execution_id: String },

  /// A completion handle was used after the step already completed.
  #[error("execution '{execution_id}' already completed")]
  AlreadyCompleted { execution_id: String },

  /// The completion handles were dropped without completing the step.
  #[error("execution '{execution_id}' was abandoned before completing")]
  Abandoned { execution_id: String },

  /// Persisted state references a flow the activity no longer has.
  #[error("execution '{execution_id}' state references unknown {direction} flow '{flow_id}'")]
  UnknownFlow {
    execution_id: String,
    direction: &'static str,
    flow_id: String,
  },

  /// Persisted state is malformed.
  #[error("invalid execution state: {message}")]
  InvalidState { message: String },
}

/// Failure reported by an activity behavior through a postponed step.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ActivityFailure {
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
}

impl ActivityFailure {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      code: None,
    }
  }

  pub fn with_code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }
}
