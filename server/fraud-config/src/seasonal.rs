//! Date-windowed multipliers for numeric thresholds.
//!
//! Periods are compared on zero-padded "MM-DD" strings. A period whose start sorts
//! after its end wraps the year boundary ("11-15" .. "01-10"). Periods are parsed
//! and validated when the store is built, so a bad entry fails the load instead of
//! letting a later overlapping period take its place.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::overrides::OverrideResolver;
use crate::path;
use crate::store::ConfigStore;

pub const SEASONAL_ENABLED_PATH: &str = "learning.seasonal_adjustments.enabled";
pub const SEASONAL_PERIODS_PATH: &str = "learning.seasonal_adjustments.periods";

/// One configured window. Multipliers are keyed by the full config path of the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalPeriod {
  #[serde(default)]
  pub name: Option<String>,
  pub start: String,
  pub end: String,
  #[serde(default)]
  pub multipliers: HashMap<String, f64>,
}

impl SeasonalPeriod {
  /// Whether `month_day` ("MM-DD") falls inside this period, ends inclusive.
  pub fn contains(&self, month_day: &str) -> bool {
    let (start, end) = (self.start.as_str(), self.end.as_str());
    if start <= end {
      start <= month_day && month_day <= end
    } else {
      month_day >= start || month_day <= end
    }
  }

  pub fn multiplier(&self, threshold_key: &str) -> f64 {
    self.multipliers.get(threshold_key).copied().unwrap_or(1.0)
  }
}

/// "MM-DD" key used for period matching.
pub fn month_day(date: NaiveDate) -> String {
  date.format("%m-%d").to_string()
}

/// Parse `learning.seasonal_adjustments.periods` out of a whole document.
///
/// Absent means no periods. Anything present must be a list of well-formed periods;
/// the first bad field is reported as a validation error.
pub fn parse_periods(doc: &Value) -> Result<Vec<SeasonalPeriod>, ConfigError> {
  let list = match path::get(doc, SEASONAL_PERIODS_PATH) {
    Some(list) => list,
    None => return Ok(Vec::new()),
  };
  let entries = list
    .as_array()
    .ok_or_else(|| ConfigError::validation(SEASONAL_PERIODS_PATH, "must be a list of periods"))?;

  entries
    .iter()
    .enumerate()
    .map(|(i, entry)| {
      let field = format!("{}[{}]", SEASONAL_PERIODS_PATH, i);
      let entry = entry
        .as_object()
        .ok_or_else(|| ConfigError::validation(&field, "period must be a mapping"))?;
      parse_period(&field, entry)
    })
    .collect()
}

fn parse_period(field: &str, entry: &Map<String, Value>) -> Result<SeasonalPeriod, ConfigError> {
  let name = match entry.get("name") {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => Some(s.clone()),
    Some(_) => {
      return Err(ConfigError::validation(
        &format!("{}.name", field),
        "must be a string",
      ))
    }
  };

  let mut multipliers = HashMap::new();
  match entry.get("multipliers") {
    None | Some(Value::Null) => {}
    Some(Value::Object(map)) => {
      for (key, raw) in map {
        let factor = path::as_f64(raw).ok_or_else(|| {
          ConfigError::validation(
            &format!("{}.multipliers.{}", field, key),
            "multiplier must be numeric",
          )
        })?;
        multipliers.insert(key.clone(), factor);
      }
    }
    Some(_) => {
      return Err(ConfigError::validation(
        &format!("{}.multipliers", field),
        "must be a mapping of threshold path to multiplier",
      ))
    }
  }

  Ok(SeasonalPeriod {
    name,
    start: parse_month_day(field, "start", entry)?,
    end: parse_month_day(field, "end", entry)?,
    multipliers,
  })
}

fn parse_month_day(
  field: &str,
  bound: &str,
  entry: &Map<String, Value>,
) -> Result<String, ConfigError> {
  let field = format!("{}.{}", field, bound);
  let raw = entry
    .get(bound)
    .and_then(Value::as_str)
    .ok_or_else(|| ConfigError::validation(&field, "required \"MM-DD\" string"))?;
  // 2000 is a leap year, so "02-29" is accepted.
  let zero_padded = raw.len() == 5;
  if !zero_padded || NaiveDate::parse_from_str(&format!("2000-{}", raw), "%Y-%m-%d").is_err() {
    return Err(ConfigError::validation(
      &field,
      &format!("\"{}\" is not a zero-padded \"MM-DD\" date", raw),
    ));
  }
  Ok(raw.to_string())
}

/// Scales thresholds by the first seasonal period covering a date.
#[derive(Debug, Clone)]
pub struct SeasonalAdjuster {
  config: Arc<ConfigStore>,
  overrides: OverrideResolver,
}

impl SeasonalAdjuster {
  pub fn new(config: Arc<ConfigStore>) -> Self {
    let overrides = OverrideResolver::new(config.clone());
    Self { config, overrides }
  }

  pub fn is_enabled(&self) -> bool {
    self.config.get_bool(SEASONAL_ENABLED_PATH, false)
  }

  /// Configured periods in document order.
  pub fn periods(&self) -> &[SeasonalPeriod] {
    self.config.seasonal_periods()
  }

  /// First period covering `date`, or `None` when adjustments are disabled or none match.
  pub fn active_period(&self, date: NaiveDate) -> Option<SeasonalPeriod> {
    if !self.is_enabled() {
      return None;
    }
    let key = month_day(date);
    self.periods().iter().find(|p| p.contains(&key)).cloned()
  }

  /// Multiplier for `threshold_key` on `date`; 1.0 unless an active period names the key.
  pub fn multiplier(&self, threshold_key: &str, date: NaiveDate) -> f64 {
    self
      .active_period(date)
      .map(|p| p.multiplier(threshold_key))
      .unwrap_or(1.0)
  }

  pub fn multiplier_today(&self, threshold_key: &str) -> f64 {
    self.multiplier(threshold_key, today())
  }

  /// Base value at `path` scaled by the multiplier stored under `path` itself.
  pub fn adjusted_threshold_on(&self, path: &str, default: f64, date: NaiveDate) -> f64 {
    self.config.get_f64(path, default) * self.multiplier(path, date)
  }

  pub fn adjusted_threshold(&self, path: &str, default: f64) -> f64 {
    self.adjusted_threshold_on(path, default, today())
  }

  /// Outlet-effective value at `path` scaled by the seasonal multiplier.
  pub fn adjusted_threshold_for_outlet(
    &self,
    path: &str,
    outlet_id: &str,
    default: f64,
    date: NaiveDate,
  ) -> f64 {
    self.overrides.get_f64_for_outlet(path, outlet_id, default) * self.multiplier(path, date)
  }
}

fn today() -> NaiveDate {
  Local::now().date_naive()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::path;
  use crate::store::REQUIRED_SECTIONS;
  use serde_json::json;

  fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
  }

  fn adjuster(enabled: bool, periods: Value) -> SeasonalAdjuster {
    let mut doc = serde_json::Map::new();
    for section in REQUIRED_SECTIONS {
      doc.insert(section.to_string(), json!({}));
    }
    let mut doc = Value::Object(doc);
    path::set(&mut doc, SEASONAL_ENABLED_PATH, json!(enabled));
    path::set(&mut doc, SEASONAL_PERIODS_PATH, periods);
    path::set(&mut doc, "x", json!(10.0));
    path::set(&mut doc, "outlet_overrides.outlet_3.x", json!(20.0));
    SeasonalAdjuster::new(Arc::new(ConfigStore::from_value(doc).unwrap()))
  }

  fn holiday() -> Value {
    json!([{ "start": "11-01", "end": "12-31", "multipliers": { "x": 1.5 } }])
  }

  #[test]
  fn matching_period_applies_multiplier() {
    let a = adjuster(true, holiday());
    assert_eq!(a.multiplier("x", date(12, 15)), 1.5);
    assert_eq!(a.multiplier("x", date(11, 1)), 1.5);
    assert_eq!(a.multiplier("x", date(12, 31)), 1.5);
  }

  #[test]
  fn outside_period_is_neutral() {
    let a = adjuster(true, holiday());
    assert_eq!(a.multiplier("x", date(6, 1)), 1.0);
  }

  #[test]
  fn disabled_is_neutral_regardless_of_date() {
    let a = adjuster(false, holiday());
    assert_eq!(a.multiplier("x", date(12, 15)), 1.0);
    assert!(a.active_period(date(12, 15)).is_none());
  }

  #[test]
  fn unnamed_key_in_active_period_is_neutral() {
    let a = adjuster(true, holiday());
    assert_eq!(a.multiplier("y", date(12, 15)), 1.0);
  }

  #[test]
  fn first_matching_period_wins() {
    let a = adjuster(
      true,
      json!([
        { "start": "12-01", "end": "12-31", "multipliers": { "x": 2.0 } },
        { "start": "11-01", "end": "12-31", "multipliers": { "x": 1.5 } }
      ]),
    );
    assert_eq!(a.multiplier("x", date(12, 10)), 2.0);
    assert_eq!(a.multiplier("x", date(11, 10)), 1.5);
  }

  #[test]
  fn year_boundary_period_wraps() {
    let a = adjuster(
      true,
      json!([{ "start": "11-15", "end": "01-10", "multipliers": { "x": 1.2 } }]),
    );
    assert_eq!(a.multiplier("x", date(12, 25)), 1.2);
    assert_eq!(a.multiplier("x", date(1, 5)), 1.2);
    assert_eq!(a.multiplier("x", date(2, 1)), 1.0);
  }

  fn parse_err(periods: Value) -> String {
    let mut doc = json!({});
    path::set(&mut doc, SEASONAL_PERIODS_PATH, periods);
    let err = parse_periods(&doc).unwrap_err();
    assert!(err.is_validation());
    err.to_string()
  }

  #[test]
  fn malformed_periods_are_rejected() {
    assert!(parse_err(json!([{ "start": "11-01" }])).contains("periods[0].end"));
    assert!(parse_err(json!([holiday()[0], "not a period"])).contains("periods[1]"));
    assert!(parse_err(json!([{ "start": "2-1", "end": "12-31" }])).contains("periods[0].start"));
    assert!(parse_err(json!([{ "start": "02-30", "end": "12-31" }])).contains("periods[0].start"));
    assert!(parse_err(json!([{ "start": "01-01", "end": "12-31", "multipliers": [2] }]))
      .contains("periods[0].multipliers"));
    assert!(parse_err(json!({ "start": "01-01" })).contains("must be a list"));
  }

  #[test]
  fn one_bad_multiplier_does_not_hand_the_date_to_a_later_period() {
    let err = parse_err(json!([
      { "start": "11-01", "end": "12-31", "multipliers": { "x": 1.5, "y": "n/a" } },
      { "start": "01-01", "end": "12-31", "multipliers": { "x": 0.5 } }
    ]));
    assert!(err.contains("periods[0].multipliers.y"));
  }

  #[test]
  fn lenient_fields_parse() {
    let mut doc = json!({});
    path::set(
      &mut doc,
      SEASONAL_PERIODS_PATH,
      json!([
        { "start": "02-29", "end": "03-01" },
        { "name": null, "start": "11-01", "end": "12-31", "multipliers": { "x": "2.5" } }
      ]),
    );
    let periods = parse_periods(&doc).unwrap();
    assert_eq!(periods.len(), 2);
    assert!(periods[0].multipliers.is_empty());
    assert_eq!(periods[1].multiplier("x"), 2.5);
    assert!(parse_periods(&json!({})).unwrap().is_empty());
  }

  #[test]
  fn dotted_threshold_keys_are_looked_up_verbatim() {
    let a = adjuster(
      true,
      json!([{
        "start": "11-01", "end": "12-31",
        "multipliers": { "payment_type_fraud.unusual_payment_type_threshold": 2.0 }
      }]),
    );
    assert_eq!(
      a.multiplier("payment_type_fraud.unusual_payment_type_threshold", date(11, 2)),
      2.0
    );
  }

  #[test]
  fn adjusted_thresholds_scale_base_and_outlet_values() {
    let a = adjuster(true, holiday());
    assert_eq!(a.adjusted_threshold_on("x", 0.0, date(12, 15)), 15.0);
    assert_eq!(a.adjusted_threshold_on("x", 0.0, date(6, 1)), 10.0);
    assert_eq!(a.adjusted_threshold_on("missing", 4.0, date(12, 15)), 4.0);
    assert_eq!(a.adjusted_threshold_for_outlet("x", "3", 0.0, date(12, 15)), 30.0);
    assert_eq!(a.adjusted_threshold_for_outlet("x", "4", 0.0, date(12, 15)), 15.0);
  }

  #[test]
  fn month_day_is_zero_padded() {
    assert_eq!(month_day(date(3, 7)), "03-07");
  }
}
