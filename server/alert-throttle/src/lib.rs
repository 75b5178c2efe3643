//! Fraud Alert Throttle
//!
//! Decides whether a fraud alert may be delivered for a staff member and
//! records deliveries in an append-only log. State is never cached: every
//! check re-reads the log, and log failures fail open.

pub mod error;
pub mod log;
pub mod memory;
pub mod observer;
pub mod postgres;
pub mod settings;
pub mod throttle;

pub use error::StoreError;
pub use log::{AlertLog, AlertRecord};
pub use memory::MemoryAlertLog;
pub use observer::{StoreOp, ThrottleObserver, TracingObserver};
pub use postgres::PgAlertLog;
pub use settings::ThrottleSettings;
pub use throttle::{AlertThrottle, ThrottleState};
