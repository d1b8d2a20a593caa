use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pulse_codec::HASH_HEADER;
use tracing::warn;

use super::{buffer_request, buffer_response};
use crate::state::AppState;

/// Verify the `HashSHA256` header against the request body and sign the
/// response body the same way. With no key configured everything passes
/// through untouched.
///
/// The body is buffered before hashing and then restored for the handlers;
/// writes without a signature are rejected outright when a key is set.
pub async fn verify_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.signer.is_enabled() {
        return next.run(req).await;
    }
    if req.method() != Method::POST {
        // Reads carry no body to verify, but their responses are signed.
        let response = next.run(req).await;
        return sign_response(&state, response).await;
    }

    let (parts, bytes) = match buffer_request(req).await {
        Ok(buffered) => buffered,
        Err(resp) => return resp,
    };

    let verified = match parts.headers.get(HASH_HEADER).and_then(|v| v.to_str().ok()) {
        Some(presented) => state.signer.verify(&bytes, presented),
        None => false,
    };
    if !verified {
        warn!(uri = %parts.uri, "rejecting request with bad or missing signature");
        return (StatusCode::BAD_REQUEST, "signature mismatch").into_response();
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
    sign_response(&state, response).await
}

async fn sign_response(state: &AppState, response: Response) -> Response {
    let (mut parts, bytes) = match buffer_response(response).await {
        Ok(buffered) => buffered,
        Err(resp) => return resp,
    };
    if let Some(signature) = state.signer.sign(&bytes) {
        if let Ok(value) = HeaderValue::from_str(&signature) {
            parts.headers.insert("hashsha256", value);
        }
    }
    Response::from_parts(parts, Body::from(bytes))
}
