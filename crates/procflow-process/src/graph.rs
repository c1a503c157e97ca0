use std::collections::{HashMap, HashSet};

use crate::activity::SequenceFlow;

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: activity_id -> list of downstream activity_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: activity_id -> list of upstream activity_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Activities with no incoming flows, in definition order.
  entry_points: Vec<String>,
  /// Activities with multiple incoming flows.
  join_points: HashSet<String>,
  /// Activities with multiple outgoing flows.
  fork_points: HashSet<String>,
}

impl Graph {
  /// Build a graph from activity ids (in definition order) and flows.
  pub fn new<'a>(
    activity_ids: impl IntoIterator<Item = &'a str>,
    flows: impl IntoIterator<Item = &'a SequenceFlow>,
  ) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut order = Vec::new();

    for id in activity_ids {
      adjacency.entry(id.to_string()).or_default();
      reverse_adjacency.entry(id.to_string()).or_default();
      order.push(id.to_string());
    }

    for flow in flows {
      adjacency
        .entry(flow.source_ref.clone())
        .or_default()
        .push(flow.target_ref.clone());
      reverse_adjacency
        .entry(flow.target_ref.clone())
        .or_default()
        .push(flow.source_ref.clone());
    }

    let entry_points: Vec<String> = order
      .into_iter()
      .filter(|id| reverse_adjacency.get(id).is_none_or(|v| v.is_empty()))
      .collect();

    let join_points: HashSet<String> = reverse_adjacency
      .iter()
      .filter(|(_, incoming)| incoming.len() > 1)
      .map(|(id, _)| id.clone())
      .collect();

    let fork_points: HashSet<String> = adjacency
      .iter()
      .filter(|(_, outgoing)| outgoing.len() > 1)
      .map(|(id, _)| id.clone())
      .collect();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
      join_points,
      fork_points,
    }
  }

  /// Get entry points (activities with no incoming flows).
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Get downstream activities for a given activity.
  pub fn downstream(&self, activity_id: &str) -> &[String] {
    self
      .adjacency
      .get(activity_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream activities for a given activity.
  pub fn upstream(&self, activity_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(activity_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn is_join_point(&self, activity_id: &str) -> bool {
    self.join_points.contains(activity_id)
  }

  pub fn is_fork_point(&self, activity_id: &str) -> bool {
    self.fork_points.contains(activity_id)
  }
}
