//! Per-outlet overrides layered on top of base values.

use std::sync::Arc;

use serde_json::Value;

use crate::path;
use crate::store::ConfigStore;

pub const OVERRIDES_ROOT: &str = "outlet_overrides";

/// Path of `path` inside the override tree of `outlet_id`.
pub fn override_path(outlet_id: &str, path: &str) -> String {
  format!("{}.outlet_{}.{}", OVERRIDES_ROOT, outlet_id, path)
}

/// Resolves effective values for an outlet: override when present, base otherwise.
#[derive(Debug, Clone)]
pub struct OverrideResolver {
  config: Arc<ConfigStore>,
}

impl OverrideResolver {
  pub fn new(config: Arc<ConfigStore>) -> Self {
    Self { config }
  }

  /// Effective node for `path` at `outlet_id`, or `None` when neither layer has it.
  ///
  /// Unknown outlets simply have no override.
  pub fn resolve(&self, path: &str, outlet_id: &str) -> Option<&Value> {
    self
      .config
      .get(&override_path(outlet_id, path))
      .or_else(|| self.config.get(path))
  }

  pub fn get_for_outlet(&self, path: &str, outlet_id: &str, default: Value) -> Value {
    self.resolve(path, outlet_id).cloned().unwrap_or(default)
  }

  pub fn get_f64_for_outlet(&self, path: &str, outlet_id: &str, default: f64) -> f64 {
    self
      .resolve(path, outlet_id)
      .and_then(path::as_f64)
      .unwrap_or(default)
  }

  pub fn get_bool_for_outlet(&self, path: &str, outlet_id: &str, default: bool) -> bool {
    self
      .resolve(path, outlet_id)
      .and_then(path::as_bool)
      .unwrap_or(default)
  }

  /// Outlet ids that carry an override tree.
  pub fn outlets_with_overrides(&self) -> Vec<String> {
    self
      .config
      .get(OVERRIDES_ROOT)
      .and_then(Value::as_object)
      .map(|outlets| {
        outlets
          .keys()
          .filter_map(|k| k.strip_prefix("outlet_"))
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
  }
}
