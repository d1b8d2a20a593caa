use serde::{Deserialize, Serialize};

use crate::error::MetricError;
use crate::metric::{Metric, MetricKind, MetricValue};

/// The JSON envelope exchanged on the wire and written to snapshot files:
/// `{"id": ..., "type": "gauge"|"counter", "delta": ..?, "value": ..?}`.
///
/// Unlike [`Metric`] this type can represent malformed records; converting
/// into a `Metric` is where validation happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    #[serde(rename = "id")]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl MetricPayload {
    /// A query payload: name and kind only, no value fields. Used by read
    /// requests that expect the server to fill the value in.
    pub fn query(kind: MetricKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.as_str().to_string(),
            delta: None,
            value: None,
        }
    }
}

impl From<&Metric> for MetricPayload {
    fn from(metric: &Metric) -> Self {
        let (delta, value) = match metric.value() {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        Self {
            name: metric.name().to_string(),
            kind: metric.kind().as_str().to_string(),
            delta,
            value,
        }
    }
}

impl From<Metric> for MetricPayload {
    fn from(metric: Metric) -> Self {
        Self::from(&metric)
    }
}

impl TryFrom<MetricPayload> for Metric {
    type Error = MetricError;

    fn try_from(payload: MetricPayload) -> Result<Self, MetricError> {
        if payload.name.is_empty() {
            return Err(MetricError::EmptyName);
        }
        let kind: MetricKind = payload.kind.parse()?;
        let value = match kind {
            MetricKind::Gauge => match (payload.value, payload.delta) {
                (Some(v), None) => MetricValue::Gauge(v),
                (Some(_), Some(_)) => return Err(MetricError::ConflictingValues),
                (None, _) => return Err(MetricError::MissingGauge),
            },
            MetricKind::Counter => match (payload.delta, payload.value) {
                (Some(d), None) => MetricValue::Counter(d),
                (Some(_), Some(_)) => return Err(MetricError::ConflictingValues),
                (None, _) => return Err(MetricError::MissingCounter),
            },
        };
        Metric::new(payload.name, value)
    }
}
