use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("activity not found: {0}")]
  ActivityNotFound(String),

  #[error("duplicate activity id: {0}")]
  DuplicateActivity(String),

  #[error("duplicate sequence flow id: {0}")]
  DuplicateFlow(String),

  #[error("sequence flow '{flow_id}' references unknown activity: source={source_ref}, target={target_ref}")]
  InvalidFlow {
    flow_id: String,
    source_ref: String,
    target_ref: String,
  },

  #[error("activity '{activity_id}' has more than one default flow: {flows:?}")]
  MultipleDefaultFlows {
    activity_id: String,
    flows: Vec<String>,
  },
}
