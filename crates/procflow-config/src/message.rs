//! Token payloads carried along sequence flows.
//!
//! A [`Message`] is whatever the previous step handed to the activity, plus an
//! optional [`LoopMessage`] when the execution is one iteration of a
//! multi-instance activity.
//!
//! ```json
//! { "orderId": 7, "loop": { "index": 2, "item": "sku-3", "cardinality": 5, "isSequential": false } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
  #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
  pub loop_iteration: Option<LoopMessage>,
  #[serde(flatten)]
  pub data: Map<String, Value>,
}

impl Message {
  pub fn new(data: Map<String, Value>) -> Self {
    Self {
      loop_iteration: None,
      data,
    }
  }

  /// Build a message from an arbitrary JSON value. Non-object values are kept
  /// under a `value` key.
  pub fn from_value(value: Value) -> Self {
    match value {
      Value::Object(data) => Self::new(data),
      Value::Null => Self::default(),
      other => Self::new(Map::from_iter([("value".to_string(), other)])),
    }
  }

  pub fn with_loop(mut self, loop_message: LoopMessage) -> Self {
    self.loop_iteration = Some(loop_message);
    self
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.data.get(key)
  }

  /// True when this message drives one iteration of a parallel multi-instance loop.
  pub fn is_parallel_iteration(&self) -> bool {
    self
      .loop_iteration
      .as_ref()
      .is_some_and(|l| !l.is_sequential)
  }
}

/// Iteration details of a multi-instance activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopMessage {
  pub index: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub item: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cardinality: Option<usize>,
  #[serde(default)]
  pub is_sequential: bool,
}

impl LoopMessage {
  pub fn sequential(index: usize) -> Self {
    Self {
      index,
      is_sequential: true,
      ..Default::default()
    }
  }

  pub fn parallel(index: usize) -> Self {
    Self {
      index,
      is_sequential: false,
      ..Default::default()
    }
  }

  pub fn with_item(mut self, item: Value) -> Self {
    self.item = Some(item);
    self
  }
}
