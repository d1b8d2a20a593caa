use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{Metric, MetricValue};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::warn;

use crate::error::StoreError;
use crate::store::Store;

const CREATE_GAUGES: &str =
    "CREATE TABLE IF NOT EXISTS gauges (name TEXT PRIMARY KEY, value DOUBLE PRECISION NOT NULL)";
const CREATE_COUNTERS: &str =
    "CREATE TABLE IF NOT EXISTS counters (name TEXT PRIMARY KEY, value BIGINT NOT NULL)";

const UPSERT_GAUGE: &str = "INSERT INTO gauges (name, value) VALUES ($1, $2) \
     ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value";
const UPSERT_COUNTER: &str = "INSERT INTO counters (name, value) VALUES ($1, $2) \
     ON CONFLICT (name) DO UPDATE SET value = counters.value + EXCLUDED.value";

// Delays between write attempts when the failure looks transient.
const RETRY_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(5),
];

/// SQL backing. Gauges replace via upsert, counters accumulate in the
/// database (`value = value + delta`), and batches run inside one
/// transaction. All retry handling for transient failures lives here and
/// nowhere above.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(dsn)
            .await
            .map_err(unavailable)?;
        sqlx::query(CREATE_GAUGES)
            .execute(&pool)
            .await
            .map_err(unavailable)?;
        sqlx::query(CREATE_COUNTERS)
            .execute(&pool)
            .await
            .map_err(unavailable)?;
        Ok(Self { pool })
    }

    async fn try_batch(&self, records: &[Metric]) -> Result<(), sqlx::Error> {
        // Dropping the transaction on any error rolls it back.
        let mut tx = self.pool.begin().await?;
        for record in records {
            match record.value() {
                MetricValue::Gauge(v) => {
                    sqlx::query(UPSERT_GAUGE)
                        .bind(record.name())
                        .bind(v)
                        .execute(&mut *tx)
                        .await?;
                }
                MetricValue::Counter(d) => {
                    sqlx::query(UPSERT_COUNTER)
                        .bind(record.name())
                        .bind(d)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn store_gauge(&self, name: &str, value: f64) -> Result<(), StoreError> {
        let mut delays = RETRY_BACKOFF.iter();
        loop {
            match sqlx::query(UPSERT_GAUGE)
                .bind(name)
                .bind(value)
                .execute(&self.pool)
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) => wait_or_surface(&mut delays, e).await?,
            }
        }
    }

    async fn store_counter(&self, name: &str, delta: i64) -> Result<(), StoreError> {
        let mut delays = RETRY_BACKOFF.iter();
        loop {
            match sqlx::query(UPSERT_COUNTER)
                .bind(name)
                .bind(delta)
                .execute(&self.pool)
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) => wait_or_surface(&mut delays, e).await?,
            }
        }
    }

    async fn store_batch(&self, records: &[Metric]) -> Result<(), StoreError> {
        let mut delays = RETRY_BACKOFF.iter();
        loop {
            match self.try_batch(records).await {
                Ok(()) => return Ok(()),
                Err(e) => wait_or_surface(&mut delays, e).await?,
            }
        }
    }

    async fn gauge(&self, name: &str) -> Result<f64, StoreError> {
        let row: Option<(f64,)> = sqlx::query_as("SELECT value FROM gauges WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        row.map(|(v,)| v)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn counter(&self, name: &str) -> Result<i64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM counters WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        row.map(|(v,)| v)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn metrics(&self) -> Result<Vec<Metric>, StoreError> {
        let gauges: Vec<(String, f64)> =
            sqlx::query_as("SELECT name, value FROM gauges ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;
        let counters: Vec<(String, i64)> =
            sqlx::query_as("SELECT name, value FROM counters ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;

        let mut out = Vec::with_capacity(gauges.len() + counters.len());
        for (name, value) in gauges {
            out.push(Metric::gauge(name, value)?);
        }
        for (name, delta) in counters {
            out.push(Metric::counter(name, delta)?);
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

/// Sleep before the next attempt, or surface the error once the failure is
/// permanent or the backoff schedule is exhausted.
async fn wait_or_surface(
    delays: &mut std::slice::Iter<'_, Duration>,
    err: sqlx::Error,
) -> Result<(), StoreError> {
    if !is_transient(&err) {
        return Err(unavailable(err));
    }
    match delays.next() {
        Some(delay) => {
            warn!(error = %err, "transient database error, retrying");
            tokio::time::sleep(*delay).await;
            Ok(())
        }
        None => Err(unavailable(err)),
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => match db.code() {
            // Connection failures (class 08), serialization failures and
            // unique-violation races between concurrent upserts.
            Some(code) => code.starts_with("08") || code == "40001" || code == "23505",
            None => false,
        },
        _ => false,
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_pool_errors_are_transient() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(is_transient(&io));
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn other_errors_are_permanent() {
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::WorkerCrashed));
    }
}
