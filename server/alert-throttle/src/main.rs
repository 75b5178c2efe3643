//! Binary entrypoint: throttle decisions over the Postgres alert log.
//!
//! Reads `DATABASE_URL` (required) and `FRAUD_CONFIG_PATH` (default
//! `fraud_detection_config.json`), ensures the `fraud_alert_log` schema, then
//! answers JSON lines on stdin:
//! - `{"op":"check","staff_id":7,"risk_level":"high","risk_score":91}`
//! - `{"op":"record","staff_id":7,"alert_type":"high_risk"}`

use std::io::Write;

use alert_throttle::{AlertThrottle, PgAlertLog};
use chrono::Utc;
use fraud_config::ConfigStore;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
  Check {
    staff_id: i64,
    risk_level: String,
    risk_score: f64,
  },
  Record {
    staff_id: i64,
    alert_type: String,
  },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response {
  Check {
    staff_id: i64,
    should_alert: bool,
    throttle: alert_throttle::ThrottleState,
    send: bool,
  },
  Record {
    staff_id: i64,
    recorded: bool,
  },
  Error {
    error: bool,
    message: String,
  },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
  let config_path = std::env::var("FRAUD_CONFIG_PATH")
    .unwrap_or_else(|_| "fraud_detection_config.json".into());

  let config = ConfigStore::shared(&config_path)?;
  let log = PgAlertLog::connect(&database_url).await?;
  log.ensure_schema().await?;
  let throttle = AlertThrottle::new(log, &config);

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut out = std::io::BufWriter::new(std::io::stdout().lock());

  while let Some(line) = lines.next_line().await? {
    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let response = match serde_json::from_str::<Request>(trimmed) {
      Ok(Request::Check {
        staff_id,
        risk_level,
        risk_score,
      }) => {
        let should_alert = throttle.should_alert(&risk_level, risk_score);
        let state = throttle.throttle_state_at(staff_id, Utc::now()).await;
        Response::Check {
          staff_id,
          should_alert,
          throttle: state,
          send: should_alert && !state.is_throttled(),
        }
      }
      Ok(Request::Record {
        staff_id,
        alert_type,
      }) => Response::Record {
        staff_id,
        recorded: throttle.log_alert_sent(staff_id, &alert_type).await,
      },
      Err(e) => Response::Error {
        error: true,
        message: format!("json parse: {}", e),
      },
    };

    serde_json::to_writer(&mut out, &response)?;
    writeln!(out)?;
    out.flush()?;
  }

  Ok(())
}
