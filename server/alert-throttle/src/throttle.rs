//! Per-staff alert throttling, re-derived from the durable log on every call.
//!
//! Two callers checking the same staff member at once can both see `Eligible`
//! and both append, so the daily cap is a best-effort bound.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fraud_config::ConfigStore;
use serde::Serialize;
use tracing::debug;

use crate::log::AlertLog;
use crate::observer::{StoreOp, ThrottleObserver, TracingObserver};
use crate::settings::ThrottleSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleState {
  Eligible,
  /// Daily cap reached in the trailing 24 hours.
  ThrottledByVolume,
  /// Latest alert is younger than the cooldown.
  ThrottledByCooldown,
}

impl ThrottleState {
  pub fn is_throttled(self) -> bool {
    self != Self::Eligible
  }
}

pub struct AlertThrottle<L> {
  log: L,
  settings: ThrottleSettings,
  observer: Arc<dyn ThrottleObserver>,
}

impl<L: AlertLog> AlertThrottle<L> {
  /// Throttle over `log` with parameters taken from the `alerts` section.
  pub fn new(log: L, config: &ConfigStore) -> Self {
    Self::with_settings(log, ThrottleSettings::from_config(config))
  }

  pub fn with_settings(log: L, settings: ThrottleSettings) -> Self {
    Self {
      log,
      settings,
      observer: Arc::new(TracingObserver),
    }
  }

  pub fn with_observer(mut self, observer: Arc<dyn ThrottleObserver>) -> Self {
    self.observer = observer;
    self
  }

  pub fn settings(&self) -> &ThrottleSettings {
    &self.settings
  }

  pub fn log(&self) -> &L {
    &self.log
  }

  /// Whether a risk assessment warrants an alert at all (before throttling).
  pub fn should_alert(&self, risk_level: &str, risk_score: f64) -> bool {
    if !self.settings.enabled {
      return false;
    }
    self.settings.alert_risk_levels.contains(risk_level)
      || risk_score >= self.settings.alert_risk_score_threshold
  }

  /// Throttle state of `staff_id` as of `now`. Store failures read as `Eligible`.
  pub async fn throttle_state_at(&self, staff_id: i64, now: DateTime<Utc>) -> ThrottleState {
    let since = now - self.settings.volume_window();
    let sent = match self.log.count_since(staff_id, since).await {
      Ok(n) => n,
      Err(e) => {
        self.observer.store_failure(StoreOp::CountSince, staff_id, &e);
        return ThrottleState::Eligible;
      }
    };

    let state = if sent >= self.settings.max_alerts_per_staff_per_day {
      ThrottleState::ThrottledByVolume
    } else {
      match self.log.most_recent(staff_id).await {
        Ok(Some(last)) if now - last < self.settings.cooldown() => {
          ThrottleState::ThrottledByCooldown
        }
        Ok(_) => ThrottleState::Eligible,
        Err(e) => {
          self.observer.store_failure(StoreOp::MostRecent, staff_id, &e);
          ThrottleState::Eligible
        }
      }
    };

    if state.is_throttled() {
      self.observer.throttled(staff_id, state);
    }
    state
  }

  pub async fn should_throttle_alert(&self, staff_id: i64) -> bool {
    self.throttle_state_at(staff_id, Utc::now()).await.is_throttled()
  }

  /// Alerts logged for `staff_id` since `since`; 0 when the store is unavailable.
  pub async fn alerts_sent_since(&self, staff_id: i64, since: DateTime<Utc>) -> u64 {
    match self.log.count_since(staff_id, since).await {
      Ok(n) => n,
      Err(e) => {
        self.observer.store_failure(StoreOp::CountSince, staff_id, &e);
        0
      }
    }
  }

  /// `should_alert` and not throttled as of `now`.
  pub async fn may_send_at(
    &self,
    staff_id: i64,
    risk_level: &str,
    risk_score: f64,
    now: DateTime<Utc>,
  ) -> bool {
    if !self.should_alert(risk_level, risk_score) {
      return false;
    }
    !self.throttle_state_at(staff_id, now).await.is_throttled()
  }

  /// Record a delivered alert at `sent_at`. Returns whether the append succeeded;
  /// failures go to the observer only.
  pub async fn log_alert_sent_at(
    &self,
    staff_id: i64,
    alert_type: &str,
    sent_at: DateTime<Utc>,
  ) -> bool {
    match self.log.append(staff_id, alert_type, sent_at).await {
      Ok(()) => {
        debug!(staff_id, alert_type, "alert recorded");
        true
      }
      Err(e) => {
        self.observer.store_failure(StoreOp::Append, staff_id, &e);
        false
      }
    }
  }

  pub async fn log_alert_sent(&self, staff_id: i64, alert_type: &str) -> bool {
    self.log_alert_sent_at(staff_id, alert_type, Utc::now()).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::StoreError;
  use crate::memory::MemoryAlertLog;
  use async_trait::async_trait;
  use chrono::{Duration, TimeZone};
  use parking_lot::Mutex;

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
  }

  fn throttle() -> AlertThrottle<MemoryAlertLog> {
    AlertThrottle::with_settings(MemoryAlertLog::new(), ThrottleSettings::default())
  }

  struct DownLog;

  #[async_trait]
  impl AlertLog for DownLog {
    async fn count_since(&self, _staff_id: i64, _since: DateTime<Utc>) -> Result<u64, StoreError> {
      Err(StoreError::unavailable("connection refused"))
    }
    async fn most_recent(&self, _staff_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
      Err(StoreError::unavailable("connection refused"))
    }
    async fn append(
      &self,
      _staff_id: i64,
      _alert_type: &str,
      _sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
      Err(StoreError::unavailable("connection refused"))
    }
  }

  #[derive(Default)]
  struct Recorder {
    failures: Mutex<Vec<(StoreOp, i64)>>,
    throttled: Mutex<Vec<(i64, ThrottleState)>>,
  }

  impl ThrottleObserver for Recorder {
    fn store_failure(&self, op: StoreOp, staff_id: i64, _error: &StoreError) {
      self.failures.lock().push((op, staff_id));
    }
    fn throttled(&self, staff_id: i64, state: ThrottleState) {
      self.throttled.lock().push((staff_id, state));
    }
  }

  #[test]
  fn should_alert_by_level_or_score() {
    let t = throttle();
    assert!(!t.should_alert("medium", 50.0));
    assert!(t.should_alert("medium", 85.0));
    assert!(t.should_alert("medium", 80.0));
    assert!(t.should_alert("high", 10.0));
    assert!(t.should_alert("critical", 0.0));
  }

  #[test]
  fn should_alert_respects_master_switch() {
    let settings = ThrottleSettings {
      enabled: false,
      ..ThrottleSettings::default()
    };
    let t = AlertThrottle::with_settings(MemoryAlertLog::new(), settings);
    assert!(!t.should_alert("critical", 100.0));
  }

  #[tokio::test]
  async fn fresh_staff_is_eligible() {
    let t = throttle();
    assert_eq!(t.throttle_state_at(7, t0()).await, ThrottleState::Eligible);
  }

  #[tokio::test]
  async fn recent_alert_triggers_cooldown() {
    let t = throttle();
    t.log_alert_sent_at(7, "high_risk", t0() - Duration::hours(2)).await;
    assert_eq!(
      t.throttle_state_at(7, t0()).await,
      ThrottleState::ThrottledByCooldown
    );
    // Exactly at the cooldown boundary the staff member is eligible again.
    assert_eq!(
      t.throttle_state_at(7, t0() + Duration::hours(4)).await,
      ThrottleState::Eligible
    );
  }

  #[tokio::test]
  async fn daily_cap_triggers_volume_throttle_then_clears() {
    let t = throttle();
    for hours_ago in [10, 8, 7] {
      t.log_alert_sent_at(7, "high_risk", t0() - Duration::hours(hours_ago))
        .await;
    }
    assert_eq!(
      t.throttle_state_at(7, t0()).await,
      ThrottleState::ThrottledByVolume
    );
    // 25h after the third alert, both limits have lapsed.
    let later = t0() + Duration::hours(18);
    assert_eq!(t.throttle_state_at(7, later).await, ThrottleState::Eligible);
  }

  #[tokio::test]
  async fn other_staff_are_unaffected() {
    let t = throttle();
    t.log_alert_sent_at(7, "high_risk", t0()).await;
    assert!(t.throttle_state_at(7, t0()).await.is_throttled());
    assert!(!t.throttle_state_at(8, t0()).await.is_throttled());
  }

  #[tokio::test]
  async fn store_failure_fails_open_and_is_reported() {
    let recorder = Arc::new(Recorder::default());
    let t = AlertThrottle::with_settings(DownLog, ThrottleSettings::default())
      .with_observer(recorder.clone());

    assert_eq!(t.throttle_state_at(7, t0()).await, ThrottleState::Eligible);
    assert!(!t.log_alert_sent_at(7, "high_risk", t0()).await);
    assert_eq!(t.alerts_sent_since(7, t0()).await, 0);

    let failures = recorder.failures.lock().clone();
    assert_eq!(
      failures,
      vec![
        (StoreOp::CountSince, 7),
        (StoreOp::Append, 7),
        (StoreOp::CountSince, 7)
      ]
    );
  }

  #[tokio::test]
  async fn observer_sees_throttle_decisions() {
    let recorder = Arc::new(Recorder::default());
    let t = throttle().with_observer(recorder.clone());
    t.log_alert_sent_at(7, "high_risk", t0()).await;
    t.throttle_state_at(7, t0()).await;
    assert_eq!(
      recorder.throttled.lock().clone(),
      vec![(7, ThrottleState::ThrottledByCooldown)]
    );
  }

  #[tokio::test]
  async fn may_send_combines_decision_and_throttle() {
    let t = throttle();
    assert!(!t.may_send_at(7, "low", 10.0, t0()).await);
    assert!(t.may_send_at(7, "high", 10.0, t0()).await);
    t.log_alert_sent_at(7, "high_risk", t0()).await;
    assert!(!t.may_send_at(7, "high", 10.0, t0()).await);
  }
}
