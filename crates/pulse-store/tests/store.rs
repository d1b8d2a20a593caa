use std::sync::Arc;

use pulse_core::Metric;
use pulse_store::{MemoryStore, Store};

fn gauge(name: &str, value: f64) -> Metric {
    Metric::gauge(name, value).unwrap()
}

fn counter(name: &str, delta: i64) -> Metric {
    Metric::counter(name, delta).unwrap()
}

// ── Gauges ──────────────────────────────────────────────────────

#[tokio::test]
async fn gauge_last_write_wins() {
    let store = MemoryStore::new();
    store.store_gauge("temp", 1.5).await.unwrap();
    store.store_gauge("temp", 42.5).await.unwrap();
    assert_eq!(store.gauge("temp").await.unwrap(), 42.5);
}

#[tokio::test]
async fn gauge_missing_is_not_found() {
    let store = MemoryStore::new();
    let err = store.gauge("missing").await.unwrap_err();
    assert!(err.is_not_found());
    // The failed read must not create an entry.
    assert!(store.metrics().await.unwrap().is_empty());
}

// ── Counters ────────────────────────────────────────────────────

#[tokio::test]
async fn counter_accumulates() {
    let store = MemoryStore::new();
    store.store_counter("hits", 3).await.unwrap();
    store.store_counter("hits", 4).await.unwrap();
    assert_eq!(store.counter("hits").await.unwrap(), 7);
}

#[tokio::test]
async fn counter_respects_negative_deltas() {
    let store = MemoryStore::new();
    store.store_counter("hits", 10).await.unwrap();
    store.store_counter("hits", -4).await.unwrap();
    assert_eq!(store.counter("hits").await.unwrap(), 6);
}

#[tokio::test]
async fn counter_wraps_on_overflow() {
    let store = MemoryStore::new();
    store.store_counter("hits", i64::MAX).await.unwrap();
    store.store_counter("hits", 1).await.unwrap();
    assert_eq!(store.counter("hits").await.unwrap(), i64::MIN);
}

#[tokio::test]
async fn counter_missing_is_not_found() {
    let store = MemoryStore::new();
    assert!(store.counter("missing").await.unwrap_err().is_not_found());
}

// ── Batches ─────────────────────────────────────────────────────

#[tokio::test]
async fn batch_applies_every_record_in_order() {
    let store = MemoryStore::new();
    store
        .store_batch(&[
            gauge("a", 1.0),
            gauge("a", 2.0),
            counter("b", 5),
            counter("b", 5),
        ])
        .await
        .unwrap();

    assert_eq!(store.gauge("a").await.unwrap(), 2.0);
    assert_eq!(store.counter("b").await.unwrap(), 10);
}

#[tokio::test]
async fn batch_does_not_stop_at_a_new_counter() {
    // A batch whose first record creates a counter must still apply the
    // records after it.
    let store = MemoryStore::new();
    store
        .store_batch(&[counter("fresh", 1), gauge("after", 9.0), counter("fresh", 2)])
        .await
        .unwrap();

    assert_eq!(store.counter("fresh").await.unwrap(), 3);
    assert_eq!(store.gauge("after").await.unwrap(), 9.0);
}

#[tokio::test]
async fn concurrent_batches_lose_no_deltas() {
    let store = Arc::new(MemoryStore::new());
    let mut tasks = Vec::new();
    for _ in 0..32 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .store_batch(&[counter("hits", 1), counter("hits", 1)])
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(store.counter("hits").await.unwrap(), 64);
}

#[tokio::test]
async fn readers_never_observe_half_a_batch() {
    // Each batch writes the same value to both gauges while it holds the
    // write lock, so a reader snapshot must always see them equal.
    let store = Arc::new(MemoryStore::new());
    store
        .store_batch(&[gauge("left", 0.0), gauge("right", 0.0)])
        .await
        .unwrap();

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 1..200 {
                store
                    .store_batch(&[gauge("left", f64::from(i)), gauge("right", f64::from(i))])
                    .await
                    .unwrap();
            }
        })
    };

    for _ in 0..200 {
        let snapshot = store.metrics().await.unwrap();
        let left = snapshot.iter().find(|m| m.name() == "left").unwrap();
        let right = snapshot.iter().find(|m| m.name() == "right").unwrap();
        assert_eq!(left.value(), right.value());
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}

// ── Snapshot listing ────────────────────────────────────────────

#[tokio::test]
async fn metrics_lists_everything_in_stable_order() {
    let store = MemoryStore::new();
    store.store_gauge("b_gauge", 2.0).await.unwrap();
    store.store_gauge("a_gauge", 1.0).await.unwrap();
    store.store_counter("z_counter", 3).await.unwrap();
    store.store_counter("a_counter", 4).await.unwrap();

    let names: Vec<_> = store
        .metrics()
        .await
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    assert_eq!(names, ["a_gauge", "b_gauge", "a_counter", "z_counter"]);

    // Stable across calls.
    let again: Vec<_> = store
        .metrics()
        .await
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    assert_eq!(names, again);
}

#[tokio::test]
async fn ping_is_trivially_healthy() {
    assert!(MemoryStore::new().ping().await.is_ok());
}

#[tokio::test]
async fn open_with_empty_dsn_yields_memory() {
    let store = pulse_store::open("").await.unwrap();
    store.store_gauge("x", 1.0).await.unwrap();
    assert_eq!(store.gauge("x").await.unwrap(), 1.0);
}
