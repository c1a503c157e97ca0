use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use procflow_config::ProcessDef;
use tracing::debug;

use crate::activity::{Activity, SequenceFlow};
use crate::error::ProcessError;
use crate::graph::Graph;

/// A linked process ready for execution.
#[derive(Debug, Clone)]
pub struct Process {
  pub id: String,
  pub name: String,
  activities: Vec<Arc<Activity>>,
  index: HashMap<String, usize>,
  flows: HashMap<String, Arc<SequenceFlow>>,
  graph: Graph,
}

impl Process {
  /// Validate a definition and wire its flows into the activities.
  pub fn new(def: ProcessDef) -> Result<Self, ProcessError> {
    let mut activity_ids = HashSet::new();
    for activity in &def.activities {
      if !activity_ids.insert(activity.id.as_str()) {
        return Err(ProcessError::DuplicateActivity(activity.id.clone()));
      }
    }

    let mut flow_ids = HashSet::new();
    let mut flows = Vec::with_capacity(def.sequence_flows.len());
    for flow in def.sequence_flows {
      if !flow_ids.insert(flow.id.clone()) {
        return Err(ProcessError::DuplicateFlow(flow.id));
      }
      if !activity_ids.contains(flow.source_ref.as_str())
        || !activity_ids.contains(flow.target_ref.as_str())
      {
        return Err(ProcessError::InvalidFlow {
          flow_id: flow.id,
          source_ref: flow.source_ref,
          target_ref: flow.target_ref,
        });
      }
      flows.push(Arc::new(SequenceFlow::from(flow)));
    }

    let graph = Graph::new(
      def.activities.iter().map(|a| a.id.as_str()),
      flows.iter().map(|f| f.as_ref()),
    );

    let mut activities = Vec::with_capacity(def.activities.len());
    let mut index = HashMap::with_capacity(def.activities.len());
    for activity_def in def.activities {
      let inbound: Vec<Arc<SequenceFlow>> = flows
        .iter()
        .filter(|f| f.target_ref == activity_def.id)
        .cloned()
        .collect();
      let outbound: Vec<Arc<SequenceFlow>> = flows
        .iter()
        .filter(|f| f.source_ref == activity_def.id)
        .cloned()
        .collect();

      let defaults: Vec<String> = outbound
        .iter()
        .filter(|f| f.is_default)
        .map(|f| f.id.clone())
        .collect();
      if defaults.len() > 1 {
        return Err(ProcessError::MultipleDefaultFlows {
          activity_id: activity_def.id,
          flows: defaults,
        });
      }

      index.insert(activity_def.id.clone(), activities.len());
      activities.push(Arc::new(Activity::new(activity_def, inbound, outbound)));
    }

    debug!(
      process_id = %def.id,
      activities = activities.len(),
      flows = flows.len(),
      "process linked"
    );

    Ok(Self {
      id: def.id,
      name: def.name,
      activities,
      index,
      flows: flows.into_iter().map(|f| (f.id.clone(), f)).collect(),
      graph,
    })
  }

  /// Get an activity by ID.
  pub fn activity(&self, activity_id: &str) -> Result<&Arc<Activity>, ProcessError> {
    self
      .index
      .get(activity_id)
      .map(|i| &self.activities[*i])
      .ok_or_else(|| ProcessError::ActivityNotFound(activity_id.to_string()))
  }

  /// Get a sequence flow by ID.
  pub fn flow(&self, flow_id: &str) -> Option<&Arc<SequenceFlow>> {
    self.flows.get(flow_id)
  }

  /// Activities in definition order.
  pub fn activities(&self) -> &[Arc<Activity>] {
    &self.activities
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }
}
