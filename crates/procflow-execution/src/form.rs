//! Form binding for user-facing activities.

use procflow_config::{FormDef, FormFieldDef};
use procflow_environment::Environment;
use procflow_resolver::{ExpressionResolver, FieldType, ResolveError, coerce_value};
use serde::Serialize;
use serde_json::{Map, Value};

/// A form schema bound to an execution's input and environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
  #[serde(skip_serializing_if = "Option::is_none")]
  key: Option<String>,
  fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(rename = "type")]
  pub field_type: String,
  #[serde(skip)]
  default_template: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default_value: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<Value>,
}

impl From<&FormFieldDef> for FormField {
  fn from(def: &FormFieldDef) -> Self {
    Self {
      id: def.id.clone(),
      label: def.label.clone(),
      field_type: def.field_type.clone(),
      default_template: def.default_value.clone(),
      default_value: None,
      value: None,
    }
  }
}

impl Form {
  pub fn new(def: &FormDef) -> Self {
    Self {
      key: def.key.clone(),
      fields: def.fields.iter().map(FormField::from).collect(),
    }
  }

  /// Render field defaults against the environment with `input` in scope.
  pub fn init(
    &mut self,
    input: &Value,
    environment: &Environment,
    resolver: &ExpressionResolver,
  ) -> Result<(), ResolveError> {
    let scope = environment.variables_and_services(Some(Map::from_iter([(
      "input".to_string(),
      input.clone(),
    )])));

    for field in &mut self.fields {
      let Some(template) = &field.default_template else {
        continue;
      };
      let rendered = resolver.render(template, &scope)?;
      field.default_value = Some(coerce_value(&rendered, FieldType::parse(&field.field_type))?);
    }

    Ok(())
  }

  pub fn key(&self) -> Option<&str> {
    self.key.as_deref()
  }

  pub fn fields(&self) -> &[FormField] {
    &self.fields
  }

  pub fn field(&self, id: &str) -> Option<&FormField> {
    self.fields.iter().find(|f| f.id == id)
  }

  /// Set a field value. Returns `false` if the form has no such field.
  pub fn set_value(&mut self, id: &str, value: Value) -> bool {
    match self.fields.iter_mut().find(|f| f.id == id) {
      Some(field) => {
        field.value = Some(value);
        true
      }
      None => false,
    }
  }

  /// Copy entered values from a persisted form snapshot, as produced by
  /// [`Form::state`]. Fields the form no longer has are skipped. Returns the
  /// number of values restored.
  pub fn restore(&mut self, snapshot: &Value) -> usize {
    let Some(fields) = snapshot.get("fields").and_then(Value::as_array) else {
      return 0;
    };

    let mut restored = 0;
    for field in fields {
      let (Some(id), Some(value)) = (field.get("id").and_then(Value::as_str), field.get("value"))
      else {
        continue;
      };
      if self.set_value(id, value.clone()) {
        restored += 1;
      }
    }
    restored
  }

  /// Current values, falling back to the rendered default.
  pub fn values(&self) -> Map<String, Value> {
    self
      .fields
      .iter()
      .map(|f| {
        let value = f
          .value
          .clone()
          .or_else(|| f.default_value.clone())
          .unwrap_or(Value::Null);
        (f.id.clone(), value)
      })
      .collect()
  }

  /// Serialized snapshot for persisted state.
  pub fn state(&self) -> Value {
    serde_json::to_value(self).unwrap_or(Value::Null)
  }
}
