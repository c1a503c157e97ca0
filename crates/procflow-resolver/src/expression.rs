//! Expression evaluation using minijinja.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::Rest;
use minijinja::{Environment, ErrorKind, Value};
use procflow_environment::{Scope, Service, Services};
use tracing::trace;

use crate::error::ResolveError;

/// Evaluates expressions and templates against a [`Scope`].
///
/// One resolver is built per process and shared by every execution.
#[derive(Debug)]
pub struct ExpressionResolver {
  env: Environment<'static>,
}

impl ExpressionResolver {
  pub fn new() -> Self {
    Self {
      env: Environment::new(),
    }
  }

  /// Evaluate an expression and return its value as JSON.
  ///
  /// A surrounding `${ ... }` is stripped before evaluation. Undefined
  /// lookups evaluate to `null`.
  pub fn resolve(&self, expression: &str, scope: &Scope) -> Result<serde_json::Value, ResolveError> {
    let source = strip_wrapper(expression);

    let compiled = self
      .env
      .compile_expression(source)
      .map_err(|e| ResolveError::Compile {
        expression: expression.to_string(),
        message: e.to_string(),
      })?;

    let value = compiled
      .eval(context(scope))
      .map_err(|e| ResolveError::Evaluate {
        expression: expression.to_string(),
        message: e.to_string(),
      })?;

    trace!(expression = %expression, value = %value, "expression resolved");

    to_json(expression, &value)
  }

  /// Render a template string against the scope.
  pub fn render(&self, template: &str, scope: &Scope) -> Result<String, ResolveError> {
    self
      .env
      .render_str(template, context(scope))
      .map_err(|e| ResolveError::Render {
        template: template.to_string(),
        message: e.to_string(),
      })
  }
}

impl Default for ExpressionResolver {
  fn default() -> Self {
    Self::new()
  }
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub fn is_truthy(value: &serde_json::Value) -> bool {
  match value {
    serde_json::Value::Null => false,
    serde_json::Value::Bool(b) => *b,
    serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    serde_json::Value::String(s) => !s.is_empty(),
    serde_json::Value::Array(a) => !a.is_empty(),
    serde_json::Value::Object(o) => !o.is_empty(),
  }
}

fn strip_wrapper(expression: &str) -> &str {
  let trimmed = expression.trim();
  match trimmed
    .strip_prefix("${")
    .and_then(|s| s.strip_suffix('}'))
  {
    Some(inner) => inner.trim(),
    None => trimmed,
  }
}

/// Build the minijinja context for a scope.
///
/// `variables` and extra keys are plain values; `services` is a map of
/// callables. Extra keys never replace `variables` or `services`.
fn context(scope: &Scope) -> Value {
  let mut ctx: BTreeMap<String, Value> = scope
    .extra
    .iter()
    .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
    .collect();
  ctx.insert(
    "variables".to_string(),
    Value::from_serialize(&scope.variables),
  );
  ctx.insert("services".to_string(), services(&scope.services));
  Value::from(ctx)
}

fn services(services: &Services) -> Value {
  let callables: BTreeMap<String, Value> = services
    .iter()
    .map(|(name, service)| (name.to_string(), callable(name, service.clone())))
    .collect();
  Value::from(callables)
}

fn callable(name: &str, service: Arc<dyn Service>) -> Value {
  let name = name.to_string();
  Value::from_function(move |args: Rest<Value>| -> Result<Value, minijinja::Error> {
    let args = args
      .0
      .iter()
      .map(serde_json::to_value)
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    let result = service.call(args).map_err(|e| {
      minijinja::Error::new(
        ErrorKind::InvalidOperation,
        format!("service '{}' failed: {}", name, e),
      )
    })?;

    Ok(Value::from_serialize(&result))
  })
}

fn to_json(expression: &str, value: &Value) -> Result<serde_json::Value, ResolveError> {
  if value.is_undefined() || value.is_none() {
    return Ok(serde_json::Value::Null);
  }
  serde_json::to_value(value).map_err(|e| ResolveError::Conversion {
    expression: expression.to_string(),
    message: e.to_string(),
  })
}
