//! Services injected into the environment.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Error returned by a failing service call.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

/// A callable exposed to expressions as `services.<name>(args...)`.
pub trait Service: Send + Sync {
  fn call(&self, args: Vec<Value>) -> Result<Value, ServiceError>;
}

impl<F> Service for F
where
  F: Fn(Vec<Value>) -> Result<Value, ServiceError> + Send + Sync,
{
  fn call(&self, args: Vec<Value>) -> Result<Value, ServiceError> {
    self(args)
  }
}

/// Named services, cheap to clone.
#[derive(Clone, Default)]
pub struct Services {
  inner: BTreeMap<String, Arc<dyn Service>>,
}

impl Services {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, service: Arc<dyn Service>) {
    self.inner.insert(name.into(), service);
  }

  pub fn get(&self, name: &str) -> Option<&Arc<dyn Service>> {
    self.inner.get(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.inner.keys().map(|k| k.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Service>)> {
    self.inner.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }
}

impl fmt::Debug for Services {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.names()).finish()
  }
}
