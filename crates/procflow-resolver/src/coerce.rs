//! Coercion of rendered strings into typed JSON values.
//!
//! Templates always render to strings. Form fields declare a type, and the
//! rendered default is parsed into that type before it is exposed.

use serde_json::Value;

use crate::error::ResolveError;

/// Declared type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
  String,
  Long,
  Number,
  Boolean,
  Json,
}

impl FieldType {
  /// Parse a field type tag. Unknown tags default to string.
  pub fn parse(tag: &str) -> Self {
    match tag {
      "long" | "integer" => FieldType::Long,
      "number" | "double" => FieldType::Number,
      "boolean" => FieldType::Boolean,
      "json" | "object" | "array" => FieldType::Json,
      _ => FieldType::String,
    }
  }

  fn name(self) -> &'static str {
    match self {
      FieldType::String => "string",
      FieldType::Long => "long",
      FieldType::Number => "number",
      FieldType::Boolean => "boolean",
      FieldType::Json => "json",
    }
  }
}

/// Coerce a single string value to a typed JSON value.
///
/// An empty string coerces to `null` for every type except string.
pub fn coerce_value(value: &str, field_type: FieldType) -> Result<Value, ResolveError> {
  if value.is_empty() && field_type != FieldType::String {
    return Ok(Value::Null);
  }

  let mismatch = || ResolveError::Coercion {
    value: value.to_string(),
    expected: field_type.name().to_string(),
  };

  match field_type {
    FieldType::String => Ok(Value::String(value.to_string())),

    FieldType::Long => value
      .trim()
      .parse::<i64>()
      .map(|n| Value::Number(n.into()))
      .map_err(|_| mismatch()),

    FieldType::Number => value
      .trim()
      .parse::<f64>()
      .ok()
      .and_then(serde_json::Number::from_f64)
      .map(Value::Number)
      .ok_or_else(mismatch),

    FieldType::Boolean => match value.trim().to_lowercase().as_str() {
      "true" => Ok(Value::Bool(true)),
      "false" => Ok(Value::Bool(false)),
      _ => Err(mismatch()),
    },

    FieldType::Json => serde_json::from_str(value).map_err(|_| mismatch()),
  }
}
