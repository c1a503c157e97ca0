use serde::{Deserialize, Serialize};

/// Form schema declared on a user-facing activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub key: Option<String>,
  #[serde(default)]
  pub fields: Vec<FormFieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldDef {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  /// Field type, e.g. `string`, `boolean`, `long`.
  #[serde(rename = "type", default = "default_field_type")]
  pub field_type: String,
  /// Template rendered against the activity input when the form is bound,
  /// e.g. `"{{ input.amount }}"`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<String>,
}

fn default_field_type() -> String {
  "string".to_string()
}

impl FormFieldDef {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: None,
      field_type: default_field_type(),
      default_value: None,
    }
  }
}
