//! Structured error types for configuration loading and validation.

use thiserror::Error;

/// Fatal configuration errors. Both variants abort startup; lookups never produce them.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The source could not be read or parsed.
  #[error("load: {path}: {reason}")]
  Load { path: String, reason: String },

  /// The document parsed but is not usable (missing section, bad pattern, ...).
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },
}

impl ConfigError {
  pub fn load(path: impl Into<String>, reason: impl ToString) -> Self {
    Self::Load {
      path: path.into(),
      reason: reason.to_string(),
    }
  }

  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation { .. })
  }
}
