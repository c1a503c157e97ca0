//! Procflow Process
//!
//! This crate provides the linked process representation for procflow.
//! A linked process is the validated form of a [`procflow_config::ProcessDef`]
//! in which every activity holds shared references to its inbound and
//! outbound sequence flows.
//!
//! Key differences from `procflow-config`:
//! - Flow endpoints are validated (no dangling source/target references)
//! - Activity and flow identifiers are unique
//! - At most one default flow leaves any activity
//! - Entry points, fork points and join points are identified

mod activity;
mod error;
mod graph;
mod process;

pub use activity::{Activity, SequenceFlow};
pub use error::ProcessError;
pub use graph::Graph;
pub use process::Process;
