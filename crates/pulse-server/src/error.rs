use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulse_core::MetricError;
use pulse_store::StoreError;

pub enum ApiError {
    /// Malformed body or record on a JSON path.
    Validation(String),
    /// Unknown metric kind on the legacy path-parameter route.
    UnknownKind(String),
    NotFound(String),
    Store(String),
}

impl From<MetricError> for ApiError {
    fn from(e: MetricError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(name) => ApiError::NotFound(format!("metric not found: {name}")),
            StoreError::Invalid(e) => ApiError::Validation(e.to_string()),
            other => ApiError::Store(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::UnknownKind(kind) => (
                StatusCode::NOT_IMPLEMENTED,
                format!("unknown metric kind: {kind}"),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, message).into_response()
    }
}
