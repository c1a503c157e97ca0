//! Input/output parameter resolution.
//!
//! # Input
//! An input parameter sees the environment scope with the triggering message's
//! fields merged on top, plus the whole message under `message`:
//! ```json
//! { "name": "amount", "expression": "orderAmount * 2" }
//! ```
//!
//! # Output
//! An output parameter sees the scope it is given (environment and resolved
//! input) with the raw behavior result merged on top, plus the whole result
//! under `result`:
//! ```json
//! { "name": "total", "expression": "r" }
//! ```

use procflow_config::{Message, ParameterDef};
use procflow_environment::Scope;
use serde_json::Value;

use crate::error::ResolveError;
use crate::expression::ExpressionResolver;

/// A declared parameter bound to a resolver.
pub struct Parameter<'a> {
  def: &'a ParameterDef,
  resolver: &'a ExpressionResolver,
}

impl<'a> Parameter<'a> {
  pub fn new(def: &'a ParameterDef, resolver: &'a ExpressionResolver) -> Self {
    Self { def, resolver }
  }

  pub fn name(&self) -> &str {
    &self.def.name
  }

  /// Resolve the parameter's input value.
  ///
  /// Message fields never replace `variables`, `services` or `message`.
  /// Without a declared source, the message field of the same name is used,
  /// then the process variable of the same name.
  pub fn input_value(&self, message: &Message, scope: &Scope) -> Result<Value, ResolveError> {
    let mut scope = scope.clone();
    scope.extend(message.data.clone());
    scope
      .extra
      .insert("message".to_string(), Value::Object(message.data.clone()));

    self.resolve_with(&scope, || {
      message
        .get(&self.def.name)
        .or_else(|| scope.variables.get(&self.def.name))
        .cloned()
        .unwrap_or(Value::Null)
    })
  }

  /// Resolve the parameter's output value against the raw result.
  ///
  /// Result fields never replace `variables`, `services` or `result`.
  /// Without a declared source, the result field of the same name is used.
  pub fn output_value(&self, result: &Value, scope: &Scope) -> Result<Value, ResolveError> {
    let mut scope = scope.clone();
    if let Value::Object(fields) = result {
      scope.extend(fields.clone());
    }
    scope.extra.insert("result".to_string(), result.clone());

    self.resolve_with(&scope, || {
      result.get(&self.def.name).cloned().unwrap_or(Value::Null)
    })
  }

  fn resolve_with(
    &self,
    scope: &Scope,
    fallback: impl FnOnce() -> Value,
  ) -> Result<Value, ResolveError> {
    let resolved = if let Some(expression) = &self.def.expression {
      self.resolver.resolve(expression, scope)
    } else if let Some(template) = &self.def.template {
      self.resolver.render(template, scope).map(Value::String)
    } else if let Some(value) = &self.def.value {
      Ok(value.clone())
    } else {
      Ok(fallback())
    };

    resolved.map_err(|e| ResolveError::Parameter {
      name: self.def.name.clone(),
      source: Box::new(e),
    })
  }
}
