//! Procflow Environment
//!
//! The environment owns the process variables and the services injected by the
//! host application. Activities never read it directly; they ask for a
//! [`Scope`], a snapshot of variables and services plus any extra keys, and
//! hand that to the resolver.
//!
//! Each iteration of a multi-instance activity works against its own clone
//! produced by [`Environment::clone_for_iteration`], so iterations never
//! write into their parent's variables.

mod environment;
mod scope;
mod service;

pub use environment::Environment;
pub use scope::Scope;
pub use service::{Service, ServiceError, Services};
