//! Observability sink injected into the throttle.

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::throttle::ThrottleState;

/// Which alert-log operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
  CountSince,
  MostRecent,
  Append,
}

impl StoreOp {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::CountSince => "count_since",
      Self::MostRecent => "most_recent",
      Self::Append => "append",
    }
  }
}

/// Receives throttle events. Store failures never reach the throttle's caller,
/// so this is where they surface.
pub trait ThrottleObserver: Send + Sync {
  fn store_failure(&self, op: StoreOp, staff_id: i64, error: &StoreError);

  fn throttled(&self, _staff_id: i64, _state: ThrottleState) {}
}

/// Default observer: forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ThrottleObserver for TracingObserver {
  fn store_failure(&self, op: StoreOp, staff_id: i64, error: &StoreError) {
    warn!(op = op.as_str(), staff_id, error = %error, "alert log unavailable, failing open");
  }

  fn throttled(&self, staff_id: i64, state: ThrottleState) {
    debug!(staff_id, state = ?state, "alert throttled");
  }
}
