use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pulse_codec::{HASH_HEADER, Opener, Sealer, Signer};
use pulse_server::routes;
use pulse_server::state::AppState;
use pulse_store::{MemoryStore, Store};
use tower::ServiceExt;

fn app_with(signer: Signer, opener: Option<Opener>) -> (Router, Arc<dyn Store>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = AppState::new(Arc::clone(&store), signer, opener);
    (routes::router(state), store)
}

fn app() -> (Router, Arc<dyn Store>) {
    app_with(Signer::new(""), None)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ── Legacy path-parameter routes ────────────────────────────────

#[tokio::test]
async fn legacy_gauge_write_then_read() {
    let (app, _) = app();

    let response = app
        .clone()
        .oneshot(post("/update/gauge/temp/42.5", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/value/gauge/temp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "42.5");
}

#[tokio::test]
async fn legacy_counter_accumulates() {
    let (app, store) = app();
    store.store_counter("hits", 3).await.unwrap();

    let response = app
        .clone()
        .oneshot(post("/update/counter/hits/4", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/value/counter/hits")).await.unwrap();
    assert_eq!(body_string(response).await, "7");
}

#[tokio::test]
async fn missing_metric_is_404() {
    let (app, _) = app();
    let response = app.oneshot(get("/value/gauge/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_kind_on_legacy_path_is_501() {
    let (app, _) = app();
    let response = app
        .oneshot(post("/update/bogus/x/1", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn malformed_legacy_value_is_400() {
    let (app, _) = app();
    let response = app
        .oneshot(post("/update/counter/hits/4.5", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── JSON routes ─────────────────────────────────────────────────

#[tokio::test]
async fn json_update_echoes_counter_total() {
    let (app, store) = app();
    store.store_counter("hits", 3).await.unwrap();

    let response = app
        .oneshot(post(
            "/update/",
            r#"{"id":"hits","type":"counter","delta":4}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let echoed = body_json(response).await;
    assert_eq!(echoed["id"], "hits");
    assert_eq!(echoed["delta"], 7);
    assert!(echoed.get("value").is_none());
}

#[tokio::test]
async fn json_update_rejects_malformed_records() {
    let (app, _) = app();
    for body in [
        "{not json",
        r#"{"id":"","type":"gauge","value":1.0}"#,
        r#"{"id":"x","type":"bogus","value":1.0}"#,
        r#"{"id":"x","type":"gauge"}"#,
        r#"{"id":"x","type":"counter"}"#,
        r#"{"id":"x","type":"gauge","delta":1,"value":1.0}"#,
    ] {
        let response = app.clone().oneshot(post("/update/", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn batch_applies_atomically_and_in_order() {
    let (app, store) = app();

    let batch = r#"[
        {"id":"a","type":"gauge","value":1.0},
        {"id":"a","type":"gauge","value":2.0},
        {"id":"b","type":"counter","delta":5},
        {"id":"b","type":"counter","delta":5}
    ]"#;
    let response = app.clone().oneshot(post("/updates/", batch)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(store.gauge("a").await.unwrap(), 2.0);
    assert_eq!(store.counter("b").await.unwrap(), 10);
}

#[tokio::test]
async fn batch_with_one_bad_record_is_rejected_whole() {
    let (app, store) = app();

    let batch = r#"[
        {"id":"good","type":"gauge","value":1.0},
        {"id":"bad","type":"counter"}
    ]"#;
    let response = app.oneshot(post("/updates/", batch)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.gauge("good").await.is_err());
}

#[tokio::test]
async fn json_value_populates_the_query() {
    let (app, store) = app();
    store.store_gauge("temp", 42.5).await.unwrap();

    let response = app
        .clone()
        .oneshot(post("/value/", r#"{"id":"temp","type":"gauge"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let populated = body_json(response).await;
    assert_eq!(populated["value"], 42.5);

    let response = app
        .clone()
        .oneshot(post("/value/", r#"{"id":"absent","type":"counter"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post("/value/", r#"{"id":"temp","type":"bogus"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── Full dump and liveness ──────────────────────────────────────

#[tokio::test]
async fn dump_lists_every_record() {
    let (app, store) = app();
    store.store_gauge("temp", 42.5).await.unwrap();
    store.store_counter("hits", 7).await.unwrap();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let dump = body_string(response).await;
    assert!(dump.contains("temp: 42.5"));
    assert!(dump.contains("hits: 7"));
}

#[tokio::test]
async fn ping_reports_store_liveness() {
    let (app, _) = app();
    let response = app.oneshot(get("/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ── Compression ─────────────────────────────────────────────────

#[tokio::test]
async fn gzip_request_bodies_are_inflated() {
    let (app, store) = app();

    let body = pulse_codec::compress(br#"[{"id":"a","type":"gauge","value":1.5}]"#).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/updates/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.gauge("a").await.unwrap(), 1.5);
}

#[tokio::test]
async fn malformed_gzip_body_is_400() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/updates/")
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from("not gzip"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn responses_are_compressed_when_accepted() {
    let (app, store) = app();
    store.store_gauge("temp", 42.5).await.unwrap();

    let request = Request::builder()
        .uri("/")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let inflated = pulse_codec::decompress(&bytes).unwrap();
    assert!(String::from_utf8(inflated).unwrap().contains("temp: 42.5"));
}

// ── Signing ─────────────────────────────────────────────────────

#[tokio::test]
async fn signed_request_with_matching_hash_is_accepted() {
    let signer = Signer::new("K");
    let (app, store) = app_with(signer.clone(), None);

    let body = br#"[{"id":"b","type":"counter","delta":5}]"#;
    let request = Request::builder()
        .method("POST")
        .uri("/updates/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(HASH_HEADER, signer.sign(body).unwrap())
        .body(Body::from(body.as_slice()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.counter("b").await.unwrap(), 5);
}

#[tokio::test]
async fn mismatched_hash_is_rejected() {
    let (app, store) = app_with(Signer::new("K"), None);

    let body = br#"[{"id":"b","type":"counter","delta":5}]"#;
    let request = Request::builder()
        .method("POST")
        .uri("/updates/")
        .header(HASH_HEADER, Signer::new("other").sign(body).unwrap())
        .body(Body::from(body.as_slice()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.counter("b").await.is_err());
}

#[tokio::test]
async fn missing_hash_with_configured_key_is_rejected() {
    let (app, _) = app_with(Signer::new("K"), None);
    let response = app
        .oneshot(post("/updates/", r#"[{"id":"b","type":"counter","delta":5}]"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn responses_carry_a_signature() {
    let signer = Signer::new("K");
    let (app, store) = app_with(signer.clone(), None);
    store.store_gauge("temp", 1.0).await.unwrap();

    let response = app.oneshot(get("/")).await.unwrap();
    let presented = response
        .headers()
        .get(HASH_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(signer.verify(&bytes, &presented));
}

// ── The full agent transformation chain ─────────────────────────

#[tokio::test]
async fn sealed_signed_compressed_batch_round_trips() {
    let mut rng = rand::thread_rng();
    let private = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let sealer = Sealer::new(rsa::RsaPublicKey::from(&private));

    let signer = Signer::new("K");
    let (app, store) = app_with(signer.clone(), Some(Opener::new(private)));

    // Agent order: encode, compress, sign the compressed body, seal.
    let encoded = br#"[{"id":"temp","type":"gauge","value":42.5},{"id":"hits","type":"counter","delta":3}]"#;
    let compressed = pulse_codec::compress(encoded).unwrap();
    let signature = signer.sign(&compressed).unwrap();
    let sealed = sealer.seal(&compressed).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/updates/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_ENCODING, "gzip")
        .header(HASH_HEADER, signature)
        .body(Body::from(sealed))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.gauge("temp").await.unwrap(), 42.5);
    assert_eq!(store.counter("hits").await.unwrap(), 3);
}
