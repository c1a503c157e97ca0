//! Input/output parameter descriptors.
//!
//! A parameter names one entry of an activity's input or output and says where
//! its value comes from. Sources are tried in this order:
//!
//! 1. `expression` - a minijinja expression, optionally wrapped in `${ ... }`
//! 2. `template` - a minijinja template rendered to a string
//! 3. `value` - a literal JSON value
//! 4. nothing - the value is looked up by the parameter's own name
//!
//! ```json
//! [
//!   { "name": "amount", "expression": "${ variables.order.amount }" },
//!   { "name": "greeting", "template": "Hello {{ variables.name | title }}!" },
//!   { "name": "retries", "value": 3 },
//!   { "name": "orderId" }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expression: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub template: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<Value>,
}

impl ParameterDef {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      expression: None,
      template: None,
      value: None,
    }
  }

  pub fn expression(name: impl Into<String>, expression: impl Into<String>) -> Self {
    Self {
      expression: Some(expression.into()),
      ..Self::named(name)
    }
  }

  pub fn template(name: impl Into<String>, template: impl Into<String>) -> Self {
    Self {
      template: Some(template.into()),
      ..Self::named(name)
    }
  }

  pub fn literal(name: impl Into<String>, value: Value) -> Self {
    Self {
      value: Some(value),
      ..Self::named(name)
    }
  }
}
