use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{Metric, MetricPayload};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::StoreError;
use crate::store::Store;

/// Write the store's full contents to `path` as a JSON array of wire
/// payloads, truncating whatever was there.
pub async fn dump(store: &dyn Store, path: &Path) -> Result<(), StoreError> {
    let metrics = store.metrics().await?;
    let payloads: Vec<MetricPayload> = metrics.iter().map(MetricPayload::from).collect();
    let data = serde_json::to_vec(&payloads).map_err(|e| StoreError::Snapshot(e.to_string()))?;

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::Snapshot(e.to_string()))?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| StoreError::Snapshot(e.to_string()))
}

/// Load a snapshot file into the store with one batch write. A missing file
/// is not an error; it just leaves the store empty.
pub async fn restore(store: &dyn Store, path: &Path) -> Result<(), StoreError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StoreError::Snapshot(e.to_string())),
    };
    let payloads: Vec<MetricPayload> =
        serde_json::from_slice(&data).map_err(|e| StoreError::Snapshot(e.to_string()))?;

    let mut records = Vec::with_capacity(payloads.len());
    for payload in payloads {
        records.push(Metric::try_from(payload)?);
    }
    store.store_batch(&records).await
}

/// Store decorator that signals a [`Notify`] after every accepted write.
/// This is how a zero store-interval becomes "dump after each write"
/// without a free-running loop: the snapshotter sleeps on the other end of
/// the notify.
pub struct NotifyingStore {
    inner: Arc<dyn Store>,
    written: Arc<Notify>,
}

impl NotifyingStore {
    pub fn new(inner: Arc<dyn Store>, written: Arc<Notify>) -> Self {
        Self { inner, written }
    }
}

#[async_trait]
impl Store for NotifyingStore {
    async fn store_gauge(&self, name: &str, value: f64) -> Result<(), StoreError> {
        self.inner.store_gauge(name, value).await?;
        self.written.notify_one();
        Ok(())
    }

    async fn store_counter(&self, name: &str, delta: i64) -> Result<(), StoreError> {
        self.inner.store_counter(name, delta).await?;
        self.written.notify_one();
        Ok(())
    }

    async fn store_batch(&self, records: &[Metric]) -> Result<(), StoreError> {
        self.inner.store_batch(records).await?;
        self.written.notify_one();
        Ok(())
    }

    async fn gauge(&self, name: &str) -> Result<f64, StoreError> {
        self.inner.gauge(name).await
    }

    async fn counter(&self, name: &str) -> Result<i64, StoreError> {
        self.inner.counter(name).await
    }

    async fn metrics(&self) -> Result<Vec<Metric>, StoreError> {
        self.inner.metrics().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

/// Background dump task. Interval mode dumps on a timer; write mode (store
/// interval of zero) dumps whenever the paired [`NotifyingStore`] reports a
/// write. Either way a final dump runs when the token fires.
pub struct Snapshotter {
    store: Arc<dyn Store>,
    path: PathBuf,
    interval: Duration,
    written: Arc<Notify>,
}

impl Snapshotter {
    pub fn new(
        store: Arc<dyn Store>,
        path: impl Into<PathBuf>,
        interval: Duration,
        written: Arc<Notify>,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            interval,
            written,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        if self.interval.is_zero() {
            self.run_on_write(&cancel).await;
        } else {
            self.run_interval(&cancel).await;
        }

        match dump(self.store.as_ref(), &self.path).await {
            Ok(()) => info!(path = %self.path.display(), "final snapshot written"),
            Err(e) => error!(error = %e, "final snapshot failed"),
        }
    }

    async fn run_interval(&self, cancel: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick of a tokio interval fires immediately; we only want
        // the spaced ones.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => self.dump_and_log().await,
                _ = cancel.cancelled() => return,
            }
        }
    }

    async fn run_on_write(&self, cancel: &CancellationToken) {
        loop {
            tokio::select! {
                _ = self.written.notified() => self.dump_and_log().await,
                _ = cancel.cancelled() => return,
            }
        }
    }

    async fn dump_and_log(&self) {
        if let Err(e) = dump(self.store.as_ref(), &self.path).await {
            error!(error = %e, path = %self.path.display(), "snapshot failed");
        }
    }
}
