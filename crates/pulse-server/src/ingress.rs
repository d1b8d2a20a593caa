use pulse_core::{Metric, MetricValue};
use pulse_store::{Store, StoreError};

/// Route a validated record to the matching store operation.
pub(crate) async fn apply(store: &dyn Store, metric: &Metric) -> Result<(), StoreError> {
    match metric.value() {
        MetricValue::Gauge(v) => store.store_gauge(metric.name(), v).await,
        MetricValue::Counter(d) => store.store_counter(metric.name(), d).await,
    }
}

/// The record to echo back after a write: counters carry their
/// post-increment total, gauges just what was written.
pub(crate) async fn stored_echo(store: &dyn Store, metric: &Metric) -> Result<Metric, StoreError> {
    match metric.value() {
        MetricValue::Counter(_) => {
            let total = store.counter(metric.name()).await?;
            Ok(Metric::counter(metric.name(), total)?)
        }
        MetricValue::Gauge(_) => Ok(metric.clone()),
    }
}
