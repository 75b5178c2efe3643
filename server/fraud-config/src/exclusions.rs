//! Staff exclusions, whitelists, suspicious-name patterns, and feature flags.
//!
//! Every predicate treats missing configuration as "not excluded", "not
//! whitelisted", or "not suspicious".

use std::sync::Arc;

use tracing::debug;

use crate::store::ConfigStore;

pub const EXCLUDED_STAFF_PATH: &str = "staff_exclusions.excluded_staff_ids";
pub const PARTIAL_EXCLUSIONS_PATH: &str = "staff_exclusions.partial_exclusions";
pub const WHITELISTED_PAYMENT_TYPES_PATH: &str = "whitelisting.payment_types";
pub const WHITELISTED_CUSTOMERS_PATH: &str = "whitelisting.customers";
pub const WHITELISTED_PRODUCTS_PATH: &str = "whitelisting.products";
pub const LEGITIMATE_REASONS_PATH: &str = "whitelisting.legitimate_adjustment_reasons";

#[derive(Debug, Clone)]
pub struct ExclusionEngine {
  config: Arc<ConfigStore>,
}

impl ExclusionEngine {
  pub fn new(config: Arc<ConfigStore>) -> Self {
    Self { config }
  }

  // -------------------------------------------------------------------------
  // Staff
  // -------------------------------------------------------------------------

  /// Blanket exclusion from all analysis.
  pub fn is_staff_excluded(&self, staff_id: i64) -> bool {
    self
      .config
      .list_contains(EXCLUDED_STAFF_PATH, &staff_id.to_string())
  }

  pub fn is_staff_excluded_from_section(&self, staff_id: i64, section: &str) -> bool {
    self.partial_exclusion(staff_id, "sections", section)
  }

  pub fn is_staff_excluded_from_indicator(&self, staff_id: i64, indicator: &str) -> bool {
    self.partial_exclusion(staff_id, "indicators", indicator)
  }

  fn partial_exclusion(&self, staff_id: i64, kind: &str, name: &str) -> bool {
    let path = format!("{}.{}.{}", PARTIAL_EXCLUSIONS_PATH, staff_id, kind);
    self.config.list_contains(&path, name)
  }

  // -------------------------------------------------------------------------
  // Whitelists
  // -------------------------------------------------------------------------

  pub fn is_payment_type_whitelisted(&self, payment_type: &str) -> bool {
    self
      .config
      .list_contains(WHITELISTED_PAYMENT_TYPES_PATH, payment_type)
  }

  pub fn is_customer_whitelisted(&self, customer_id: &str) -> bool {
    self.config.list_contains(WHITELISTED_CUSTOMERS_PATH, customer_id)
  }

  pub fn is_product_whitelisted(&self, product_id: &str) -> bool {
    self.config.list_contains(WHITELISTED_PRODUCTS_PATH, product_id)
  }

  /// Case-insensitive substring match of `reason` against the legitimate-reason list.
  pub fn is_legitimate_adjustment_reason(&self, reason: Option<&str>) -> bool {
    let reason = match reason {
      Some(r) if !r.is_empty() => r.to_lowercase(),
      _ => return false,
    };
    self
      .config
      .get_string_set(LEGITIMATE_REASONS_PATH)
      .iter()
      .map(|entry| entry.to_lowercase())
      .any(|entry| reason.contains(&entry))
  }

  /// Whether any configured pattern matches `name`. Patterns were compiled at load.
  pub fn is_suspicious_customer_name(&self, name: Option<&str>) -> bool {
    let name = match name {
      Some(n) if !n.is_empty() => n,
      _ => return false,
    };
    let hit = self
      .config
      .suspicious_patterns()
      .iter()
      .find(|re| re.is_match(name));
    if let Some(re) = hit {
      debug!(pattern = re.as_str(), "suspicious customer name");
    }
    hit.is_some()
  }

  // -------------------------------------------------------------------------
  // Flags
  // -------------------------------------------------------------------------

  /// `global.enabled` gates everything. With `enable_all_sections` off a section
  /// must opt in; with it on a section must opt out.
  pub fn is_section_enabled(&self, section: &str) -> bool {
    if !self.config.get_bool("global.enabled", true) {
      return false;
    }
    let section_flag = format!("{}.enabled", section);
    if !self.config.get_bool("global.enable_all_sections", true) {
      return self.config.get_bool(&section_flag, false);
    }
    self.config.get_bool(&section_flag, true)
  }

  pub fn is_dry_run(&self) -> bool {
    self.config.get_bool("global.dry_run", false)
  }

  pub fn is_debug(&self) -> bool {
    self.config.get_bool("global.debug", false)
  }
}
