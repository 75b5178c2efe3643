//! Dot-notation lookup and assignment over the nested configuration document.
//!
//! Paths are split on `.` with no escaping, so a key that itself contains a dot
//! cannot be addressed. Explicit `null` leaves read the same as absent ones.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const SEPARATOR: char = '.';

/// Resolve `path` against `doc`.
///
/// Returns `None` as soon as a segment is missing, an intermediate node is not a
/// mapping, or the leaf is `null`.
pub fn get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
  let mut node = doc;
  for segment in path.split(SEPARATOR) {
    node = node.as_object()?.get(segment)?;
  }
  if node.is_null() {
    None
  } else {
    Some(node)
  }
}

/// Resolve `path`, falling back to `default` (cloned out of the document otherwise).
pub fn get_or(doc: &Value, path: &str, default: Value) -> Value {
  get(doc, path).cloned().unwrap_or(default)
}

/// Write `value` at `path`, creating intermediate mappings as needed.
///
/// A non-mapping intermediate node is replaced by an empty mapping; sibling keys at
/// every level above it are left untouched.
pub fn set(doc: &mut Value, path: &str, value: Value) {
  let mut node = doc;
  let mut segments = path.split(SEPARATOR).peekable();
  while let Some(segment) = segments.next() {
    let map = as_mapping(node);
    if segments.peek().is_none() {
      map.insert(segment.to_string(), value);
      return;
    }
    node = map.entry(segment.to_string()).or_insert(Value::Null);
  }
}

fn as_mapping(node: &mut Value) -> &mut Map<String, Value> {
  if !node.is_object() {
    *node = Value::Object(Map::new());
  }
  match node {
    Value::Object(map) => map,
    _ => unreachable!("node was just replaced with a mapping"),
  }
}

// ---------------------------------------------------------------------------
// Typed views over a resolved node
// ---------------------------------------------------------------------------

/// Numeric view. Numeric strings ("2.5") are accepted.
pub fn as_f64(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

pub fn as_i64(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Boolean view. Numbers are true when non-zero; a few flag spellings are accepted.
pub fn as_bool(value: &Value) -> Option<bool> {
  match value {
    Value::Bool(b) => Some(*b),
    Value::Number(n) => n.as_f64().map(|f| f != 0.0),
    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
      "true" | "1" | "yes" | "on" => Some(true),
      "false" | "0" | "no" | "off" | "" => Some(false),
      _ => None,
    },
    _ => None,
  }
}

/// String form of a scalar used for membership tests: strings as-is, numbers printed.
/// Whole floats print as integers, so `7.0` and `7` compare equal.
pub fn scalar_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) if n.is_f64() => n.as_f64().map(|f| {
      if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
      } else {
        n.to_string()
      }
    }),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Scalars of a sequence as a string set. Non-sequences yield the empty set.
pub fn as_string_set(value: &Value) -> BTreeSet<String> {
  value
    .as_array()
    .map(|items| items.iter().filter_map(scalar_string).collect())
    .unwrap_or_default()
}

/// Whether `value` is a sequence holding a scalar whose string form equals `needle`.
pub fn contains_scalar(value: &Value, needle: &str) -> bool {
  value
    .as_array()
    .map(|items| {
      items
        .iter()
        .filter_map(scalar_string)
        .any(|item| item == needle)
    })
    .unwrap_or(false)
}
