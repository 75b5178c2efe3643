//! The append-only alert log consumed by the throttle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// One delivered alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
  pub staff_id: i64,
  pub alert_type: String,
  pub sent_at: DateTime<Utc>,
}

/// Durable store of sent alerts. Implementations only ever append.
#[async_trait]
pub trait AlertLog: Send + Sync {
  /// Alerts for `staff_id` with `sent_at >= since`.
  async fn count_since(&self, staff_id: i64, since: DateTime<Utc>) -> Result<u64, StoreError>;

  /// Latest `sent_at` for `staff_id`, if any alert was ever logged.
  async fn most_recent(&self, staff_id: i64) -> Result<Option<DateTime<Utc>>, StoreError>;

  async fn append(
    &self,
    staff_id: i64,
    alert_type: &str,
    sent_at: DateTime<Utc>,
  ) -> Result<(), StoreError>;
}

#[async_trait]
impl<L: AlertLog + ?Sized> AlertLog for Arc<L> {
  async fn count_since(&self, staff_id: i64, since: DateTime<Utc>) -> Result<u64, StoreError> {
    (**self).count_since(staff_id, since).await
  }

  async fn most_recent(&self, staff_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
    (**self).most_recent(staff_id).await
  }

  async fn append(
    &self,
    staff_id: i64,
    alert_type: &str,
    sent_at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    (**self).append(staff_id, alert_type, sent_at).await
  }
}
