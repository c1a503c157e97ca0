use serde::{Deserialize, Serialize};

/// What `apply_state` does with persisted flow ids the activity no longer has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePolicy {
  /// Drop the unknown id and log a warning.
  #[default]
  Lenient,
  /// Fail with [`crate::ExecutionError::UnknownFlow`].
  Strict,
}

/// Configuration for activity executions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
  #[serde(default)]
  pub restore_policy: RestorePolicy,
}

impl ExecutionConfig {
  pub fn strict() -> Self {
    Self {
      restore_policy: RestorePolicy::Strict,
    }
  }
}
