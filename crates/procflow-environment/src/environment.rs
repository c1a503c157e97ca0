use std::sync::Arc;

use procflow_config::LoopMessage;
use serde_json::{Map, Value};
use tracing::debug;

use crate::scope::Scope;
use crate::service::{Service, Services};

/// Process variables and services for one execution.
#[derive(Debug, Clone, Default)]
pub struct Environment {
  variables: Map<String, Value>,
  services: Services,
  iteration: Option<LoopMessage>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_variables(variables: Map<String, Value>) -> Self {
    Self {
      variables,
      ..Self::default()
    }
  }

  pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
    self.variables.insert(name.into(), value);
  }

  pub fn variable(&self, name: &str) -> Option<&Value> {
    self.variables.get(name)
  }

  pub fn variables(&self) -> &Map<String, Value> {
    &self.variables
  }

  pub fn register_service(&mut self, name: impl Into<String>, service: Arc<dyn Service>) {
    self.services.insert(name, service);
  }

  pub fn service(&self, name: &str) -> Option<&Arc<dyn Service>> {
    self.services.get(name)
  }

  /// The loop iteration this environment was scoped to, if any.
  pub fn iteration(&self) -> Option<&LoopMessage> {
    self.iteration.as_ref()
  }

  /// Snapshot of variables and services, plus `extra` keys.
  ///
  /// An iteration-scoped environment also exposes `loop` and, when the loop
  /// carries one, `item`.
  pub fn variables_and_services(&self, extra: Option<Map<String, Value>>) -> Scope {
    let mut scope = Scope::new(self.variables.clone(), self.services.clone());

    if let Some(iteration) = &self.iteration {
      scope.extra.insert(
        "loop".to_string(),
        serde_json::to_value(iteration).unwrap_or(Value::Null),
      );
      if let Some(item) = &iteration.item {
        scope.extra.insert("item".to_string(), item.clone());
      }
    }

    if let Some(extra) = extra {
      scope.extend(extra);
    }

    scope
  }

  /// Derive an environment for one loop iteration. The parent is untouched.
  pub fn clone_for_iteration(&self, loop_message: &LoopMessage) -> Environment {
    debug!(
      index = loop_message.index,
      is_sequential = loop_message.is_sequential,
      "scoping environment for loop iteration"
    );

    Environment {
      variables: self.variables.clone(),
      services: self.services.clone(),
      iteration: Some(loop_message.clone()),
    }
  }
}
