use serde::{Deserialize, Serialize};

use crate::activity::ActivityDef;
use crate::flow::SequenceFlowDef;

/// A process definition as loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDef {
  pub id: String,
  #[serde(default)]
  pub name: String,
  pub activities: Vec<ActivityDef>,
  #[serde(default)]
  pub sequence_flows: Vec<SequenceFlowDef>,
}
