use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::{buffer_request, buffer_response};

/// Transparent gzip: inflate request bodies arriving with
/// `Content-Encoding: gzip`, and deflate compressible responses when the
/// client advertised `Accept-Encoding: gzip`.
pub async fn decompress(req: Request, next: Next) -> Response {
    let gzipped = header_mentions_gzip(req.headers(), CONTENT_ENCODING);
    let accepts_gzip = header_mentions_gzip(req.headers(), ACCEPT_ENCODING);

    let req = if gzipped {
        let (mut parts, bytes) = match buffer_request(req).await {
            Ok(buffered) => buffered,
            Err(resp) => return resp,
        };
        let plain = match pulse_codec::decompress(&bytes) {
            Ok(plain) => plain,
            Err(_) => {
                return (StatusCode::BAD_REQUEST, "malformed gzip body").into_response();
            }
        };
        parts.headers.remove(CONTENT_ENCODING);
        parts.headers.remove(CONTENT_LENGTH);
        Request::from_parts(parts, Body::from(plain))
    } else {
        req
    };

    let response = next.run(req).await;
    if accepts_gzip && compressible(response.headers()) {
        compress_response(response).await
    } else {
        response
    }
}

fn header_mentions_gzip(headers: &HeaderMap, name: axum::http::header::HeaderName) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"))
}

fn compressible(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json") || ct.contains("text") || ct.contains("html"))
}

async fn compress_response(response: Response) -> Response {
    let (mut parts, bytes) = match buffer_response(response).await {
        Ok(buffered) => buffered,
        Err(resp) => return resp,
    };
    match pulse_codec::compress(&bytes) {
        Ok(compressed) => {
            parts.headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(compressed))
        }
        // Serving the identity body beats failing the request.
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}
