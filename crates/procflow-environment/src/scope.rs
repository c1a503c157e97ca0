//! Evaluation scope handed to the resolver.

use serde_json::{Map, Value};
use tracing::trace;

use crate::service::Services;

/// Top-level keys owned by the scope itself. Extra keys never shadow them.
pub const RESERVED_KEYS: [&str; 2] = ["variables", "services"];

/// Variables, services and extra keys visible to an expression.
///
/// As JSON a scope looks like:
/// ```json
/// { "variables": { "amount": 10 }, "services": ["lookup"], "loop": { "index": 0 } }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scope {
  pub variables: Map<String, Value>,
  pub services: Services,
  pub extra: Map<String, Value>,
}

impl Scope {
  pub fn new(variables: Map<String, Value>, services: Services) -> Self {
    Self {
      variables,
      services,
      extra: Map::new(),
    }
  }

  pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
  }

  /// Insert one extra key, replacing any previous value. Reserved keys are
  /// ignored.
  pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
    self.insert(key.into(), value);
    self
  }

  /// Merge extra keys; the given keys win on collision. Reserved keys are
  /// ignored.
  pub fn extend(&mut self, extra: Map<String, Value>) {
    for (key, value) in extra {
      self.insert(key, value);
    }
  }

  fn insert(&mut self, key: String, value: Value) {
    if Self::is_reserved(&key) {
      trace!(key = %key, "ignoring extra key shadowing the scope");
      return;
    }
    self.extra.insert(key, value);
  }

  /// Look up a top-level key the same way expressions see it.
  pub fn get(&self, key: &str) -> Option<Value> {
    match key {
      "variables" => Some(Value::Object(self.variables.clone())),
      "services" => Some(self.service_names()),
      _ => self.extra.get(key).cloned(),
    }
  }

  /// JSON view of the scope. Services appear as their names.
  pub fn to_value(&self) -> Value {
    let mut map = Map::new();
    for (key, value) in &self.extra {
      map.insert(key.clone(), value.clone());
    }
    map.insert(
      "variables".to_string(),
      Value::Object(self.variables.clone()),
    );
    map.insert("services".to_string(), self.service_names());
    Value::Object(map)
  }

  fn service_names(&self) -> Value {
    Value::Array(
      self
        .services
        .names()
        .map(|n| Value::String(n.to_string()))
        .collect(),
    )
  }
}
