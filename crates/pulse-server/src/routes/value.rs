use std::fmt::Write as _;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use pulse_core::{MetricKind, MetricPayload, MetricValue};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /value/ — JSON read: the payload names a metric, the response is the
/// same payload populated with the current value.
pub async fn value_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MetricPayload>, ApiError> {
    let payload: MetricPayload =
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?;
    if payload.name.is_empty() {
        return Err(ApiError::Validation("metric name is empty".to_string()));
    }
    let kind: MetricKind = payload
        .kind
        .parse()
        .map_err(|e: pulse_core::MetricError| ApiError::Validation(e.to_string()))?;

    let mut populated = MetricPayload::query(kind, payload.name.clone());
    match kind {
        MetricKind::Gauge => populated.value = Some(state.store.gauge(&payload.name).await?),
        MetricKind::Counter => populated.delta = Some(state.store.counter(&payload.name).await?),
    }
    Ok(Json(populated))
}

/// GET /value/{kind}/{name} — plain-text read.
pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<String, ApiError> {
    let kind: MetricKind = kind.parse().map_err(|_| ApiError::UnknownKind(kind))?;
    match kind {
        MetricKind::Gauge => Ok(state.store.gauge(&name).await?.to_string()),
        MetricKind::Counter => Ok(state.store.counter(&name).await?.to_string()),
    }
}

/// GET / — plain full dump, one `name: value` line per record.
pub async fn dump_all(State(state): State<AppState>) -> Result<String, ApiError> {
    let metrics = state.store.metrics().await?;
    let mut out = String::new();
    for metric in metrics {
        match metric.value() {
            MetricValue::Gauge(v) => {
                let _ = writeln!(out, "{}: {v}", metric.name());
            }
            MetricValue::Counter(d) => {
                let _ = writeln!(out, "{}: {d}", metric.name());
            }
        }
    }
    Ok(out)
}
