use pulse_core::{Metric, MetricError, MetricValue};
use serde::{Deserialize, Serialize};

/// A metric on the RPC wire. The value is a real tagged union, so a frame
/// cannot carry a counter and a gauge value at once; only the name can be
/// malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMetric {
    pub name: String,
    pub value: RpcValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RpcValue {
    Gauge(f64),
    Counter(i64),
}

impl From<&Metric> for RpcMetric {
    fn from(metric: &Metric) -> Self {
        let value = match metric.value() {
            MetricValue::Gauge(v) => RpcValue::Gauge(v),
            MetricValue::Counter(d) => RpcValue::Counter(d),
        };
        Self {
            name: metric.name().to_string(),
            value,
        }
    }
}

impl TryFrom<RpcMetric> for Metric {
    type Error = MetricError;

    fn try_from(wire: RpcMetric) -> Result<Self, MetricError> {
        let value = match wire.value {
            RpcValue::Gauge(v) => MetricValue::Gauge(v),
            RpcValue::Counter(d) => MetricValue::Counter(d),
        };
        Metric::new(wire.name, value)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    GetMetric { kind: String, name: String },
    GetMetrics,
    AddMetric(RpcMetric),
    AddMetrics(Vec<RpcMetric>),
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    Metric(RpcMetric),
    Metrics(Vec<RpcMetric>),
    Error(String),
}
