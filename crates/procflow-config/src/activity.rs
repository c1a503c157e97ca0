use serde::{Deserialize, Serialize};

use crate::form::FormDef;
use crate::parameter::ParameterDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDef {
  pub id: String,
  /// Type tag, e.g. `userTask`, `serviceTask`, `exclusiveGateway`.
  #[serde(rename = "type")]
  pub activity_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub io: Option<IoDef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub form: Option<FormDef>,
}

impl ActivityDef {
  pub fn new(id: impl Into<String>, activity_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      activity_type: activity_type.into(),
      name: None,
      io: None,
      form: None,
    }
  }

  pub fn with_io(mut self, io: IoDef) -> Self {
    self.io = Some(io);
    self
  }

  pub fn with_form(mut self, form: FormDef) -> Self {
    self.form = Some(form);
    self
  }
}

/// Declared input/output parameter mapping of an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoDef {
  #[serde(default)]
  pub input: Vec<ParameterDef>,
  #[serde(default)]
  pub output: Vec<ParameterDef>,
}

impl IoDef {
  pub fn has_input(&self) -> bool {
    !self.input.is_empty()
  }

  pub fn has_output(&self) -> bool {
    !self.output.is_empty()
  }
}
