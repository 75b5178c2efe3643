//! In-process alert log for tests and dry runs. Nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::log::{AlertLog, AlertRecord};

#[derive(Debug, Default)]
pub struct MemoryAlertLog {
  records: Mutex<Vec<AlertRecord>>,
}

impl MemoryAlertLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of every record in append order.
  pub fn records(&self) -> Vec<AlertRecord> {
    self.records.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.records.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.lock().is_empty()
  }
}

#[async_trait]
impl AlertLog for MemoryAlertLog {
  async fn count_since(&self, staff_id: i64, since: DateTime<Utc>) -> Result<u64, StoreError> {
    let records = self.records.lock();
    Ok(
      records
        .iter()
        .filter(|r| r.staff_id == staff_id && r.sent_at >= since)
        .count() as u64,
    )
  }

  async fn most_recent(&self, staff_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
    let records = self.records.lock();
    Ok(
      records
        .iter()
        .filter(|r| r.staff_id == staff_id)
        .map(|r| r.sent_at)
        .max(),
    )
  }

  async fn append(
    &self,
    staff_id: i64,
    alert_type: &str,
    sent_at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    self.records.lock().push(AlertRecord {
      staff_id,
      alert_type: alert_type.to_string(),
      sent_at,
    });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
  }

  #[tokio::test]
  async fn counts_only_matching_staff_inside_window() {
    let log = MemoryAlertLog::new();
    log.append(7, "high_risk", ts(1)).await.unwrap();
    log.append(7, "high_risk", ts(5)).await.unwrap();
    log.append(8, "high_risk", ts(5)).await.unwrap();

    assert_eq!(log.count_since(7, ts(0)).await.unwrap(), 2);
    assert_eq!(log.count_since(7, ts(5)).await.unwrap(), 1);
    assert_eq!(log.count_since(7, ts(5) + Duration::seconds(1)).await.unwrap(), 0);
    assert_eq!(log.count_since(9, ts(0)).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn most_recent_is_latest_timestamp_not_latest_append() {
    let log = MemoryAlertLog::new();
    assert_eq!(log.most_recent(7).await.unwrap(), None);

    log.append(7, "a", ts(9)).await.unwrap();
    log.append(7, "b", ts(3)).await.unwrap();
    assert_eq!(log.most_recent(7).await.unwrap(), Some(ts(9)));
    assert_eq!(log.len(), 2);
    assert_eq!(log.records()[1].alert_type, "b");
  }
}
