//! Errors from the durable alert log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database: {0}")]
  Database(#[from] sqlx_core::Error),

  #[error("unavailable: {0}")]
  Unavailable(String),
}

impl StoreError {
  pub fn unavailable(msg: impl Into<String>) -> Self {
    Self::Unavailable(msg.into())
  }
}
