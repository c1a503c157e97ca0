//! The activity side of an execution.

use procflow_process::{Activity, SequenceFlow};
use serde_json::{Map, Value};

/// An activity as seen by its execution context.
///
/// Only [`ActivityBehaviour::activity`] is required. The lifecycle hooks
/// default to no-ops, which is what a plain graph node does.
pub trait ActivityBehaviour: Send + Sync {
  /// The graph node: id, type, io, form and attached flows.
  fn activity(&self) -> &Activity;

  /// Activity-owned state merged into the execution snapshot.
  fn state(&self) -> Option<Map<String, Value>> {
    None
  }

  fn cancel(&self) {}

  fn discard(&self, _inbound_flow: Option<&SequenceFlow>, _root_flow: Option<&str>) {}
}

impl ActivityBehaviour for Activity {
  fn activity(&self) -> &Activity {
    self
  }
}
