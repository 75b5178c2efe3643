//! JSON-lines query contract for the `fraud-config` binary.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::exclusions::ExclusionEngine;
use crate::overrides::OverrideResolver;
use crate::seasonal::SeasonalAdjuster;
use crate::store::ConfigStore;

// ---------------------------------------------------------------------------
// Inbound (what the caller sends)
// ---------------------------------------------------------------------------

/// One query line. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Query {
  Get {
    path: String,
    #[serde(default)]
    default: Value,
  },
  GetForOutlet {
    path: String,
    outlet_id: String,
    #[serde(default)]
    default: Value,
  },
  Multiplier {
    key: String,
    #[serde(default)]
    date: Option<NaiveDate>,
  },
  AdjustedThreshold {
    path: String,
    #[serde(default)]
    default: f64,
    #[serde(default)]
    outlet_id: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
  },
  IsStaffExcluded {
    staff_id: i64,
  },
  IsStaffExcludedFromSection {
    staff_id: i64,
    section: String,
  },
  IsStaffExcludedFromIndicator {
    staff_id: i64,
    indicator: String,
  },
  IsPaymentTypeWhitelisted {
    payment_type: String,
  },
  IsCustomerWhitelisted {
    customer_id: String,
  },
  IsProductWhitelisted {
    product_id: String,
  },
  IsLegitimateAdjustmentReason {
    #[serde(default)]
    reason: Option<String>,
  },
  IsSuspiciousCustomerName {
    #[serde(default)]
    name: Option<String>,
  },
  IsSectionEnabled {
    section: String,
  },
  Flags,
  Dump,
}

// ---------------------------------------------------------------------------
// Outbound (what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
  pub op: &'static str,
  pub value: Value,
}

/// Structured error output for unparseable lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
    }
  }
}

/// Answers queries against one loaded configuration.
pub struct QueryEngine {
  config: Arc<ConfigStore>,
  overrides: OverrideResolver,
  seasonal: SeasonalAdjuster,
  exclusions: ExclusionEngine,
}

impl QueryEngine {
  pub fn new(config: Arc<ConfigStore>) -> Self {
    Self {
      overrides: OverrideResolver::new(config.clone()),
      seasonal: SeasonalAdjuster::new(config.clone()),
      exclusions: ExclusionEngine::new(config.clone()),
      config,
    }
  }

  pub fn answer(&self, query: &Query) -> Answer {
    let (op, value) = match query {
      Query::Get { path, default } => ("get", self.config.get_or(path, default.clone())),
      Query::GetForOutlet {
        path,
        outlet_id,
        default,
      } => (
        "get_for_outlet",
        self.overrides.get_for_outlet(path, outlet_id, default.clone()),
      ),
      Query::Multiplier { key, date } => {
        let m = match date {
          Some(d) => self.seasonal.multiplier(key, *d),
          None => self.seasonal.multiplier_today(key),
        };
        ("multiplier", json!(m))
      }
      Query::AdjustedThreshold {
        path,
        default,
        outlet_id,
        date,
      } => {
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let v = match outlet_id {
          Some(outlet) => self
            .seasonal
            .adjusted_threshold_for_outlet(path, outlet, *default, date),
          None => self.seasonal.adjusted_threshold_on(path, *default, date),
        };
        ("adjusted_threshold", json!(v))
      }
      Query::IsStaffExcluded { staff_id } => (
        "is_staff_excluded",
        json!(self.exclusions.is_staff_excluded(*staff_id)),
      ),
      Query::IsStaffExcludedFromSection { staff_id, section } => (
        "is_staff_excluded_from_section",
        json!(self.exclusions.is_staff_excluded_from_section(*staff_id, section)),
      ),
      Query::IsStaffExcludedFromIndicator {
        staff_id,
        indicator,
      } => (
        "is_staff_excluded_from_indicator",
        json!(self
          .exclusions
          .is_staff_excluded_from_indicator(*staff_id, indicator)),
      ),
      Query::IsPaymentTypeWhitelisted { payment_type } => (
        "is_payment_type_whitelisted",
        json!(self.exclusions.is_payment_type_whitelisted(payment_type)),
      ),
      Query::IsCustomerWhitelisted { customer_id } => (
        "is_customer_whitelisted",
        json!(self.exclusions.is_customer_whitelisted(customer_id)),
      ),
      Query::IsProductWhitelisted { product_id } => (
        "is_product_whitelisted",
        json!(self.exclusions.is_product_whitelisted(product_id)),
      ),
      Query::IsLegitimateAdjustmentReason { reason } => (
        "is_legitimate_adjustment_reason",
        json!(self
          .exclusions
          .is_legitimate_adjustment_reason(reason.as_deref())),
      ),
      Query::IsSuspiciousCustomerName { name } => (
        "is_suspicious_customer_name",
        json!(self.exclusions.is_suspicious_customer_name(name.as_deref())),
      ),
      Query::IsSectionEnabled { section } => (
        "is_section_enabled",
        json!(self.exclusions.is_section_enabled(section)),
      ),
      Query::Flags => (
        "flags",
        json!({
          "dry_run": self.exclusions.is_dry_run(),
          "debug": self.exclusions.is_debug(),
          "seasonal_adjustments": self.seasonal.is_enabled(),
        }),
      ),
      Query::Dump => ("dump", self.config.get_all().clone()),
    };
    Answer { op, value }
  }
}

/// Answer every query line from `input` on `out`, flushing after each answer so a
/// caller on the other end of a pipe can work request by request.
pub fn serve<R: BufRead, W: Write>(engine: &QueryEngine, input: R, mut out: W) -> io::Result<()> {
  for line in input.lines() {
    let line = line?;

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    match serde_json::from_str::<Query>(trimmed) {
      Ok(query) => serde_json::to_writer(&mut out, &engine.answer(&query))?,
      Err(e) => serde_json::to_writer(&mut out, &ErrorOutput::new(format!("json parse: {}", e)))?,
    }
    writeln!(out)?;
    out.flush()?;
  }
  Ok(())
}
