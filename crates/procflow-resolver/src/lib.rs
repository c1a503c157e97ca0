//! Procflow Resolver
//!
//! Evaluates conditions and resolves input/output parameters against a
//! [`procflow_environment::Scope`] using minijinja.
//!
//! # Expressions
//! Conditions and parameter expressions use minijinja's expression syntax and
//! may be wrapped in `${ ... }`:
//! ```text
//! ${ variables.amount > 100 }
//! output.approved and not variables.blocked
//! services.lookup(variables.sku).price
//! ```
//!
//! # Templates
//! Parameters and form defaults may instead be templates, rendered to a string:
//! ```text
//! Hello {{ variables.name | title }}!
//! ```

mod coerce;
mod error;
mod expression;
mod parameter;

pub use coerce::{FieldType, coerce_value};
pub use error::ResolveError;
pub use expression::{ExpressionResolver, is_truthy};
pub use parameter::Parameter;
