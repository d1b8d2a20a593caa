mod compress;
mod crypt;
mod hashing;
mod logging;

pub use compress::decompress;
pub use crypt::decrypt;
pub use hashing::verify_signature;
pub use logging::log_request;

use axum::body::{Bytes, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

// Large enough for any sane agent batch.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Pull the whole request body into memory so a middleware can inspect it
/// and hand an equivalent request to the next layer.
pub(crate) async fn buffer_request(req: Request) -> Result<(Parts, Bytes), Response> {
    let (parts, body) = req.into_parts();
    match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => Ok((parts, bytes)),
        Err(_) => Err((StatusCode::BAD_REQUEST, "can not read body").into_response()),
    }
}

pub(crate) async fn buffer_response(resp: Response) -> Result<(axum::http::response::Parts, Bytes), Response> {
    let (parts, body) = resp.into_parts();
    match to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => Ok((parts, bytes)),
        Err(_) => Err((StatusCode::INTERNAL_SERVER_ERROR, "can not read response body").into_response()),
    }
}
