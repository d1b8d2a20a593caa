use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use pulse_core::{Metric, MetricKind, MetricPayload};

use crate::error::ApiError;
use crate::ingress::{apply, stored_echo};
use crate::state::AppState;

/// POST /update/{kind}/{name}/{value} — the legacy path-parameter form.
pub async fn update_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind: MetricKind = kind.parse().map_err(|_| ApiError::UnknownKind(kind))?;
    let metric = Metric::from_parts(kind, &name, &value)?;
    apply(state.store.as_ref(), &metric).await?;
    Ok(StatusCode::OK)
}

/// POST /update/ — JSON single write, echoing the stored record.
pub async fn update_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MetricPayload>, ApiError> {
    let payload: MetricPayload =
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?;
    let metric = Metric::try_from(payload)?;
    apply(state.store.as_ref(), &metric).await?;
    let stored = stored_echo(state.store.as_ref(), &metric).await?;
    Ok(Json(MetricPayload::from(&stored)))
}

/// POST /updates/ — JSON batch, applied with one transactional store call.
pub async fn update_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let payloads: Vec<MetricPayload> =
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut records = Vec::with_capacity(payloads.len());
    for payload in payloads {
        records.push(Metric::try_from(payload)?);
    }
    state.store.store_batch(&records).await?;
    Ok(StatusCode::OK)
}
