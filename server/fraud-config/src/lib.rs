//! Fraud Detection Configuration Engine: layered, rule-driven configuration.
//!
//! Loads one nested document per process, then answers lookups against it:
//! dot-path values, per-outlet overrides, seasonal threshold multipliers,
//! and staff/whitelist/pattern predicates.
//!
//! No DB, no network; lookups are in-memory and never fail on absent data.

pub mod error;
pub mod exclusions;
pub mod overrides;
pub mod path;
pub mod query;
pub mod seasonal;
pub mod store;

pub use error::ConfigError;
pub use exclusions::ExclusionEngine;
pub use overrides::OverrideResolver;
pub use seasonal::{SeasonalAdjuster, SeasonalPeriod};
pub use store::ConfigStore;
