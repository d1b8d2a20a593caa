use std::sync::Arc;

use pulse_core::{Metric, MetricKind};
use pulse_store::{Store, StoreError};

use crate::ingress::{apply, stored_echo};
use crate::rpc::protocol::{Request, Response, RpcMetric};

/// One connection's view of the store. Mirrors the HTTP ingress semantics:
/// writes echo the stored record (counters post-increment), reads surface
/// not-found as a protocol error string.
pub struct Session {
    store: Arc<dyn Store>,
}

impl Session {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => Response::Error(e.to_string()),
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response, StoreError> {
        match request {
            Request::GetMetric { kind, name } => {
                let kind: MetricKind = kind.parse()?;
                let metric = match kind {
                    MetricKind::Gauge => Metric::gauge(name.clone(), self.store.gauge(&name).await?)?,
                    MetricKind::Counter => {
                        Metric::counter(name.clone(), self.store.counter(&name).await?)?
                    }
                };
                Ok(Response::Metric(RpcMetric::from(&metric)))
            }
            Request::GetMetrics => {
                let metrics = self.store.metrics().await?;
                Ok(Response::Metrics(
                    metrics.iter().map(RpcMetric::from).collect(),
                ))
            }
            Request::AddMetric(wire) => {
                let metric = Metric::try_from(wire)?;
                apply(self.store.as_ref(), &metric).await?;
                let stored = stored_echo(self.store.as_ref(), &metric).await?;
                Ok(Response::Metric(RpcMetric::from(&stored)))
            }
            Request::AddMetrics(wires) => {
                let mut records = Vec::with_capacity(wires.len());
                for wire in wires {
                    records.push(Metric::try_from(wire)?);
                }
                self.store.store_batch(&records).await?;
                let metrics = self.store.metrics().await?;
                Ok(Response::Metrics(
                    metrics.iter().map(RpcMetric::from).collect(),
                ))
            }
        }
    }
}
