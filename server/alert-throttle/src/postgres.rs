//! PostgreSQL-backed alert log (`fraud_alert_log` table).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::log::AlertLog;

pub const CREATE_TABLE: &str = r#"
  CREATE TABLE IF NOT EXISTS fraud_alert_log (
    id BIGSERIAL PRIMARY KEY,
    staff_id BIGINT NOT NULL,
    alert_type TEXT NOT NULL,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT now()
  )
"#;

pub const CREATE_INDEX: &str = r#"
  CREATE INDEX IF NOT EXISTS fraud_alert_log_staff_sent_idx
    ON fraud_alert_log (staff_id, sent_at DESC)
"#;

pub struct PgAlertLog {
  pool: PgPool,
}

impl PgAlertLog {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
    let pool = PgPool::connect(database_url).await?;
    info!("alert log connected");
    Ok(Self::new(pool))
  }

  /// Create the table and its lookup index if they do not exist.
  pub async fn ensure_schema(&self) -> Result<(), StoreError> {
    query::<Postgres>(CREATE_TABLE).execute(&self.pool).await?;
    query::<Postgres>(CREATE_INDEX).execute(&self.pool).await?;
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl AlertLog for PgAlertLog {
  async fn count_since(&self, staff_id: i64, since: DateTime<Utc>) -> Result<u64, StoreError> {
    let count = query_scalar::<Postgres, i64>(
      "SELECT COUNT(*) FROM fraud_alert_log WHERE staff_id = $1 AND sent_at >= $2",
    )
    .bind(staff_id)
    .bind(since)
    .fetch_one(&self.pool)
    .await?;
    Ok(count.max(0) as u64)
  }

  async fn most_recent(&self, staff_id: i64) -> Result<Option<DateTime<Utc>>, StoreError> {
    let latest = query_scalar::<Postgres, Option<DateTime<Utc>>>(
      "SELECT MAX(sent_at) FROM fraud_alert_log WHERE staff_id = $1",
    )
    .bind(staff_id)
    .fetch_one(&self.pool)
    .await?;
    Ok(latest)
  }

  async fn append(
    &self,
    staff_id: i64,
    alert_type: &str,
    sent_at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    query::<Postgres>(
      "INSERT INTO fraud_alert_log (staff_id, alert_type, sent_at) VALUES ($1, $2, $3)",
    )
    .bind(staff_id)
    .bind(alert_type)
    .bind(sent_at)
    .execute(&self.pool)
    .await?;
    debug!(staff_id, alert_type, "alert logged");
    Ok(())
  }
}
