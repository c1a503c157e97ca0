//! Persisted execution state.
//!
//! The snapshot is a flat JSON object. Keys owned by the execution:
//!
//! - `form` - serialized form binding
//! - `pendingOutbound` - ordered outbound flow ids, only for fork points
//! - `pendingInbound` - inbound flow ids, accepted by `apply_state`
//!
//! Everything else belongs to the activity or to whoever called `set_state`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExecutionError;

pub const FORM_KEY: &str = "form";
pub const PENDING_INBOUND_KEY: &str = "pendingInbound";
pub const PENDING_OUTBOUND_KEY: &str = "pendingOutbound";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionState(Map<String, Value>);

impl ExecutionState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: Value) {
    self.0.insert(key.into(), value);
  }

  /// Merge `other` into this state; keys from `other` win.
  pub fn merge(&mut self, other: Map<String, Value>) {
    self.0.extend(other);
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn into_inner(self) -> Map<String, Value> {
    self.0
  }

  /// Persisted form snapshot, if any.
  pub fn form(&self) -> Option<&Value> {
    self.0.get(FORM_KEY)
  }

  pub fn pending_inbound(&self) -> Result<Option<Vec<String>>, ExecutionError> {
    self.flow_ids(PENDING_INBOUND_KEY)
  }

  pub fn pending_outbound(&self) -> Result<Option<Vec<String>>, ExecutionError> {
    self.flow_ids(PENDING_OUTBOUND_KEY)
  }

  fn flow_ids(&self, key: &str) -> Result<Option<Vec<String>>, ExecutionError> {
    let Some(value) = self.0.get(key) else {
      return Ok(None);
    };

    let invalid = || ExecutionError::InvalidState {
      message: format!("'{}' must be a list of flow ids, got {}", key, value),
    };

    value
      .as_array()
      .ok_or_else(invalid)?
      .iter()
      .map(|id| id.as_str().map(str::to_string).ok_or_else(invalid))
      .collect::<Result<Vec<_>, _>>()
      .map(Some)
  }
}

impl From<Map<String, Value>> for ExecutionState {
  fn from(map: Map<String, Value>) -> Self {
    Self(map)
  }
}

impl TryFrom<Value> for ExecutionState {
  type Error = ExecutionError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::Object(map) => Ok(Self(map)),
      other => Err(ExecutionError::InvalidState {
        message: format!("state must be an object, got {}", other),
      }),
    }
  }
}
