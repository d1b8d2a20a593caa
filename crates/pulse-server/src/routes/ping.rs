use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;

use crate::error::ApiError;
use crate::state::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// GET /ping — liveness of the backing store.
pub async fn ping(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    match tokio::time::timeout(PING_TIMEOUT, state.store.ping()).await {
        Ok(Ok(())) => Ok(StatusCode::OK),
        Ok(Err(e)) => Err(ApiError::Store(e.to_string())),
        Err(_) => Err(ApiError::Store("store ping timed out".to_string())),
    }
}
