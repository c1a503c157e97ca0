//! Resolution error types.

/// Errors raised while evaluating expressions, templates or parameters.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  /// The expression did not parse.
  #[error("failed to compile expression '{expression}': {message}")]
  Compile { expression: String, message: String },

  /// The expression parsed but failed at evaluation time.
  #[error("failed to evaluate expression '{expression}': {message}")]
  Evaluate { expression: String, message: String },

  /// Template rendering failed.
  #[error("failed to render template '{template}': {message}")]
  Render { template: String, message: String },

  /// The evaluated value could not be converted to JSON.
  #[error("expression '{expression}' produced a value that is not valid JSON: {message}")]
  Conversion { expression: String, message: String },

  /// A rendered string did not match the declared field type.
  #[error("value '{value}' is not a valid {expected}")]
  Coercion { value: String, expected: String },

  /// A declared parameter failed to resolve.
  #[error("parameter '{name}' could not be resolved: {source}")]
  Parameter {
    name: String,
    #[source]
    source: Box<ResolveError>,
  },
}
