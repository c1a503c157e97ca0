//! Procflow Execution
//!
//! The per-activity execution context of a process engine. Given an activity,
//! the message that reached it and the surrounding environment, an
//! [`ActivityExecution`] answers:
//!
//! - what the activity's input and output are
//! - which inbound flows a join is still waiting for
//! - which outbound flows to take once the activity is done
//! - how to suspend the step and complete it later
//! - what to persist, and how to resume from it
//!
//! Running behaviors, routing tokens and persisting snapshots are the caller's
//! business.

mod behaviour;
mod completion;
mod config;
mod error;
mod execution;
mod form;
mod state;

pub use behaviour::ActivityBehaviour;
pub use completion::{Completion, CompletionReceiver};
pub use config::{ExecutionConfig, RestorePolicy};
pub use error::{ActivityFailure, ExecutionError};
pub use execution::ActivityExecution;
pub use form::{Form, FormField};
pub use state::{ExecutionState, FORM_KEY, PENDING_INBOUND_KEY, PENDING_OUTBOUND_KEY};
