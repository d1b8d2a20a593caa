use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::Metric;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::postgres::PostgresStore;

/// The contract shared by the agent's local store and the server's durable
/// store.
///
/// Writes are atomic per operation; `store_batch` is atomic across the whole
/// list, applied in the given order. Reads for unknown names fail with
/// [`StoreError::NotFound`] and never create entries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Replace the gauge's current value. Idempotent on repeat.
    async fn store_gauge(&self, name: &str, value: f64) -> Result<(), StoreError>;

    /// Add the delta to the counter's current value (0 if absent). The sign
    /// of the delta is respected.
    async fn store_counter(&self, name: &str, delta: i64) -> Result<(), StoreError>;

    /// Apply every record or none: no partial batch is ever visible to a
    /// concurrent reader.
    async fn store_batch(&self, records: &[Metric]) -> Result<(), StoreError>;

    async fn gauge(&self, name: &str) -> Result<f64, StoreError>;

    async fn counter(&self, name: &str) -> Result<i64, StoreError>;

    /// Every record currently stored, in an order that is stable within one
    /// call.
    async fn metrics(&self) -> Result<Vec<Metric>, StoreError>;

    /// Ok iff the backing is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Pick the backing from the DSN: empty means in-memory, anything else is
/// handed to the SQL backend.
pub async fn open(dsn: &str) -> Result<Arc<dyn Store>, StoreError> {
    if dsn.is_empty() {
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Ok(Arc::new(PostgresStore::connect(dsn).await?))
    }
}
