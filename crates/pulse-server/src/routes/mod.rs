mod ping;
mod update;
mod value;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};

use crate::middleware;
use crate::state::AppState;

/// Build the full HTTP surface. The request passes the layers outermost
/// first: logging, then decryption, then signature verification, then
/// decompression — so the signature covers the compressed body, matching
/// what the agent signs before it encrypts.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(value::dump_all))
        .route("/ping", get(ping::ping))
        .route("/update/{kind}/{name}/{value}", post(update::update_path))
        .route("/update/", post(update::update_json))
        .route("/updates/", post(update::update_batch))
        .route("/value/", post(value::value_json))
        .route("/value/{kind}/{name}", get(value::value_path))
        .layer(from_fn(middleware::decompress))
        .layer(from_fn_with_state(state.clone(), middleware::verify_signature))
        .layer(from_fn_with_state(state.clone(), middleware::decrypt))
        .layer(from_fn(middleware::log_request))
        .with_state(state)
}
