//! The loaded configuration document and its validation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::path;
use crate::seasonal::{self, SeasonalPeriod};

/// Top-level sections every configuration must carry.
pub const REQUIRED_SECTIONS: [&str; 8] = [
  "global",
  "payment_type_fraud",
  "customer_account_fraud",
  "inventory_fraud",
  "register_closure_fraud",
  "banking_fraud",
  "transaction_manipulation",
  "reconciliation_fraud",
];

pub const SUSPICIOUS_PATTERNS_PATH: &str = "customer_account_fraud.suspicious_customer_patterns";

/// Sections whose contents are compiled at load and recompiled by `set`.
const DERIVED_SECTIONS: [&str; 2] = ["customer_account_fraud", "learning"];

static SHARED: OnceCell<Arc<ConfigStore>> = OnceCell::new();

/// Validated configuration document plus the regexes and seasonal periods parsed from it.
///
/// Read-only after startup; share it as `Arc<ConfigStore>`. `set` needs `&mut` and is
/// meant for startup and tests.
#[derive(Debug, Clone)]
pub struct ConfigStore {
  doc: Value,
  suspicious_patterns: Vec<Regex>,
  seasonal_periods: Vec<SeasonalPeriod>,
  source: Option<PathBuf>,
}

impl ConfigStore {
  /// Read, parse, and validate a JSON or YAML document from disk.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::load(&shown, e))?;
    let doc = parse_document(path, &raw)?;

    let mut store = Self::from_value(doc)?;
    store.source = Some(path.to_path_buf());
    info!(
      path = %shown,
      sections = store.section_names().len(),
      patterns = store.suspicious_patterns.len(),
      seasonal_periods = store.seasonal_periods.len(),
      "fraud configuration loaded"
    );
    Ok(store)
  }

  /// Validate an in-memory document. Independent of any process-wide instance.
  pub fn from_value(doc: Value) -> Result<Self, ConfigError> {
    let root = doc
      .as_object()
      .ok_or_else(|| ConfigError::validation("<root>", "configuration must be a mapping"))?;

    for section in REQUIRED_SECTIONS {
      if !root.contains_key(section) {
        return Err(ConfigError::validation(section, "required section missing"));
      }
    }

    warn_dotted_keys(&doc, "");
    let suspicious_patterns = compile_patterns(&doc)?;
    let seasonal_periods = seasonal::parse_periods(&doc)?;

    Ok(Self {
      doc,
      suspicious_patterns,
      seasonal_periods,
      source: None,
    })
  }

  /// Load once per process and hand out the same handle afterwards.
  ///
  /// Only the first caller's `path` is used; later calls get the existing handle.
  pub fn shared(path: impl AsRef<Path>) -> Result<Arc<Self>, ConfigError> {
    SHARED
      .get_or_try_init(|| Self::load(path).map(Arc::new))
      .cloned()
  }

  /// File the document was loaded from, if any.
  pub fn source(&self) -> Option<&Path> {
    self.source.as_deref()
  }

  pub fn get(&self, path: &str) -> Option<&Value> {
    path::get(&self.doc, path)
  }

  pub fn get_or(&self, path: &str, default: Value) -> Value {
    path::get_or(&self.doc, path, default)
  }

  pub fn get_bool(&self, path: &str, default: bool) -> bool {
    self.get(path).and_then(path::as_bool).unwrap_or(default)
  }

  pub fn get_f64(&self, path: &str, default: f64) -> f64 {
    self.get(path).and_then(path::as_f64).unwrap_or(default)
  }

  pub fn get_i64(&self, path: &str, default: i64) -> i64 {
    self.get(path).and_then(path::as_i64).unwrap_or(default)
  }

  pub fn get_str<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
    self.get(path).and_then(Value::as_str).unwrap_or(default)
  }

  /// Scalars of the sequence at `path`; empty when absent or not a sequence.
  pub fn get_string_set(&self, path: &str) -> BTreeSet<String> {
    self.get(path).map(path::as_string_set).unwrap_or_default()
  }

  /// Whether the sequence at `path` holds `needle` (by string form).
  pub fn list_contains(&self, path: &str, needle: &str) -> bool {
    self
      .get(path)
      .map(|list| path::contains_scalar(list, needle))
      .unwrap_or(false)
  }

  /// Runtime-only write; the source file is never touched.
  ///
  /// Writes under `customer_account_fraud` or `learning` recompile the
  /// suspicious-name patterns and seasonal periods first. A write that would leave
  /// either invalid is rejected with the document unchanged.
  pub fn set(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
    let section = path.split(path::SEPARATOR).next().unwrap_or_default();
    if DERIVED_SECTIONS.contains(&section) {
      let mut next = self.doc.clone();
      path::set(&mut next, path, value);
      let patterns = compile_patterns(&next)?;
      let periods = seasonal::parse_periods(&next)?;
      self.suspicious_patterns = patterns;
      self.seasonal_periods = periods;
      self.doc = next;
    } else {
      path::set(&mut self.doc, path, value);
    }
    debug!(path, "configuration value overridden at runtime");
    Ok(())
  }

  /// Whole document, for diagnostics.
  pub fn get_all(&self) -> &Value {
    &self.doc
  }

  pub fn section_names(&self) -> Vec<&str> {
    self
      .doc
      .as_object()
      .map(|root| root.keys().map(String::as_str).collect())
      .unwrap_or_default()
  }

  pub fn suspicious_patterns(&self) -> &[Regex] {
    &self.suspicious_patterns
  }

  /// Seasonal periods in document order, validated at load.
  pub fn seasonal_periods(&self) -> &[SeasonalPeriod] {
    &self.seasonal_periods
  }
}

fn parse_document(path: &Path, raw: &str) -> Result<Value, ConfigError> {
  let display = path.display().to_string();
  let extension = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);

  match extension.as_deref() {
    Some("json") => serde_json::from_str(raw).map_err(|e| ConfigError::load(&display, e)),
    Some("yaml") | Some("yml") => {
      serde_yaml::from_str(raw).map_err(|e| ConfigError::load(&display, e))
    }
    other => Err(ConfigError::load(
      &display,
      format!("unsupported config format: {}", other.unwrap_or("<none>")),
    )),
  }
}

fn compile_patterns(doc: &Value) -> Result<Vec<Regex>, ConfigError> {
  let list = match path::get(doc, SUSPICIOUS_PATTERNS_PATH) {
    Some(list) => list,
    None => return Ok(Vec::new()),
  };
  let items = list
    .as_array()
    .ok_or_else(|| ConfigError::validation(SUSPICIOUS_PATTERNS_PATH, "must be a list of patterns"))?;

  items
    .iter()
    .enumerate()
    .map(|(i, item)| {
      let field = format!("{}[{}]", SUSPICIOUS_PATTERNS_PATH, i);
      let pattern = item
        .as_str()
        .ok_or_else(|| ConfigError::validation(&field, "pattern must be a string"))?;
      Regex::new(pattern).map_err(|e| ConfigError::validation(&field, &e.to_string()))
    })
    .collect()
}

/// Keys with a literal dot can never be reached by a dot path.
fn warn_dotted_keys(node: &Value, prefix: &str) {
  if let Some(map) = node.as_object() {
    for (key, child) in map {
      let full = if prefix.is_empty() {
        key.clone()
      } else {
        format!("{}.{}", prefix, key)
      };
      if key.contains(path::SEPARATOR) {
        warn!(key = %full, "configuration key contains '.', unreachable by dot path");
      }
      warn_dotted_keys(child, &full);
    }
  }
}
