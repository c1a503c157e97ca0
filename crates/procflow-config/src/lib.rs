//! Procflow Config
//!
//! This crate contains the serializable process definition types for procflow.
//! These types represent a process before it is linked into a graph by
//! `procflow-process`.
//!
//! Definitions are loaded from JSON (via the CLI with a definition file, or from
//! any storage that keeps them as JSON blobs). The process crate takes these
//! types, validates the flow endpoints and wires every sequence flow into the
//! activities it connects.

mod activity;
mod flow;
mod form;
mod message;
mod parameter;
mod process;

pub use activity::{ActivityDef, IoDef};
pub use flow::SequenceFlowDef;
pub use form::{FormDef, FormFieldDef};
pub use message::{LoopMessage, Message};
pub use parameter::ParameterDef;
pub use process::ProcessDef;
