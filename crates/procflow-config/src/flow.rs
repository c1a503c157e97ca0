use serde::{Deserialize, Serialize};

/// A directed edge between two activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlowDef {
  pub id: String,
  pub source_ref: String,
  pub target_ref: String,
  /// Taken only when no sibling flow was taken. At most one per fan-out.
  #[serde(default)]
  pub is_default: bool,
  /// Expression evaluated against the source activity's output context.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
}

impl SequenceFlowDef {
  pub fn new(
    id: impl Into<String>,
    source_ref: impl Into<String>,
    target_ref: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      source_ref: source_ref.into(),
      target_ref: target_ref.into(),
      is_default: false,
      condition: None,
    }
  }

  pub fn default_flow(mut self) -> Self {
    self.is_default = true;
    self
  }

  pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
    self.condition = Some(condition.into());
    self
  }
}
