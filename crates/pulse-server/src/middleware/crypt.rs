use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::buffer_request;
use crate::state::AppState;

/// Decrypt the request body with the configured private key. Runs before
/// signature verification so the signature covers the plaintext the agent
/// signed. No key, no-op.
pub async fn decrypt(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(opener) = state.opener.clone() else {
        return next.run(req).await;
    };
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let (mut parts, bytes) = match buffer_request(req).await {
        Ok(buffered) => buffered,
        Err(resp) => return resp,
    };
    if bytes.is_empty() {
        return next.run(Request::from_parts(parts, Body::empty())).await;
    }

    match opener.open(&bytes) {
        Ok(plain) => {
            parts.headers.remove(CONTENT_LENGTH);
            next.run(Request::from_parts(parts, Body::from(plain))).await
        }
        Err(e) => {
            warn!(error = %e, "failed to decrypt request body");
            (StatusCode::INTERNAL_SERVER_ERROR, "can not decrypt body").into_response()
        }
    }
}
