//! Throttle parameters read from the `alerts` section.

use std::collections::BTreeSet;

use chrono::Duration;
use fraud_config::ConfigStore;
use serde::{Deserialize, Serialize};

/// Width of the volume window.
pub const VOLUME_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleSettings {
  /// Master switch for alert delivery (`alerts.enabled`).
  pub enabled: bool,
  /// Alerts allowed per staff member in the trailing 24 hours.
  pub max_alerts_per_staff_per_day: u64,
  /// Minimum gap after the latest alert, in hours.
  pub cooldown_hours: f64,
  /// Risk levels that always alert.
  pub alert_risk_levels: BTreeSet<String>,
  /// Score at or above which any level alerts.
  pub alert_risk_score_threshold: f64,
}

impl Default for ThrottleSettings {
  fn default() -> Self {
    Self {
      enabled: true,
      max_alerts_per_staff_per_day: 3,
      cooldown_hours: 6.0,
      alert_risk_levels: ["high", "critical"].iter().map(|s| s.to_string()).collect(),
      alert_risk_score_threshold: 80.0,
    }
  }
}

impl ThrottleSettings {
  pub fn from_config(config: &ConfigStore) -> Self {
    let defaults = Self::default();
    let alert_risk_levels = if config.get("alerts.alert_risk_levels").is_some() {
      config.get_string_set("alerts.alert_risk_levels")
    } else {
      defaults.alert_risk_levels
    };
    Self {
      enabled: config.get_bool("alerts.enabled", defaults.enabled),
      max_alerts_per_staff_per_day: config
        .get_i64(
          "alerts.max_alerts_per_staff_per_day",
          defaults.max_alerts_per_staff_per_day as i64,
        )
        .max(0) as u64,
      cooldown_hours: config.get_f64("alerts.cooldown_hours", defaults.cooldown_hours),
      alert_risk_levels,
      alert_risk_score_threshold: config
        .get_f64("alerts.alert_risk_score_threshold", defaults.alert_risk_score_threshold),
    }
  }

  /// Cooldown as a duration; saturates at `Duration::MAX` for out-of-range hours.
  pub fn cooldown(&self) -> Duration {
    let seconds = (self.cooldown_hours.max(0.0) * 3600.0).round() as i64;
    Duration::try_seconds(seconds).unwrap_or(Duration::MAX)
  }

  pub fn volume_window(&self) -> Duration {
    Duration::hours(VOLUME_WINDOW_HOURS)
  }
}
