use std::sync::Arc;

use procflow_config::{ActivityDef, FormDef, IoDef, SequenceFlowDef};
use serde::Serialize;

/// A sequence flow linked into a process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlow {
  pub id: String,
  pub source_ref: String,
  pub target_ref: String,
  pub is_default: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
}

impl From<SequenceFlowDef> for SequenceFlow {
  fn from(def: SequenceFlowDef) -> Self {
    Self {
      id: def.id,
      source_ref: def.source_ref,
      target_ref: def.target_ref,
      is_default: def.is_default,
      condition: def.condition,
    }
  }
}

/// An activity with its inbound and outbound flows attached.
#[derive(Debug, Clone)]
pub struct Activity {
  pub id: String,
  pub activity_type: String,
  pub name: Option<String>,
  pub io: Option<IoDef>,
  pub form: Option<FormDef>,
  pub inbound: Vec<Arc<SequenceFlow>>,
  pub outbound: Vec<Arc<SequenceFlow>>,
}

impl Activity {
  /// Build an activity from its definition and already-linked flows.
  pub fn new(
    def: ActivityDef,
    inbound: Vec<Arc<SequenceFlow>>,
    outbound: Vec<Arc<SequenceFlow>>,
  ) -> Self {
    Self {
      id: def.id,
      activity_type: def.activity_type,
      name: def.name,
      io: def.io,
      form: def.form,
      inbound,
      outbound,
    }
  }

  /// An activity with more than one outbound flow produces multiple tokens.
  pub fn is_fork_point(&self) -> bool {
    self.outbound.len() > 1
  }

  /// An activity with more than one inbound flow may wait for multiple tokens.
  pub fn is_join_point(&self) -> bool {
    self.inbound.len() > 1
  }

  pub fn inbound_flow(&self, flow_id: &str) -> Option<&Arc<SequenceFlow>> {
    self.inbound.iter().find(|f| f.id == flow_id)
  }

  pub fn outbound_flow(&self, flow_id: &str) -> Option<&Arc<SequenceFlow>> {
    self.outbound.iter().find(|f| f.id == flow_id)
  }

  pub fn default_flow(&self) -> Option<&Arc<SequenceFlow>> {
    self.outbound.iter().find(|f| f.is_default)
  }

  pub fn input_parameters(&self) -> &[procflow_config::ParameterDef] {
    self.io.as_ref().map(|io| io.input.as_slice()).unwrap_or(&[])
  }

  pub fn output_parameters(&self) -> &[procflow_config::ParameterDef] {
    self
      .io
      .as_ref()
      .map(|io| io.output.as_slice())
      .unwrap_or(&[])
  }
}
