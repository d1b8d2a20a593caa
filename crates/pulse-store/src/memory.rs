use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use pulse_core::{Metric, MetricError, MetricValue};

use crate::error::StoreError;
use crate::store::Store;

#[derive(Default)]
struct Maps {
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

/// In-memory backing: two maps behind a single read-write lock. Readers
/// share the lock, writers take it exclusively; a batch holds the write
/// lock for its whole duration, which is what makes it atomic.
#[derive(Default)]
pub struct MemoryStore {
    maps: RwLock<Maps>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Maps>, StoreError> {
        self.maps
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Maps>, StoreError> {
        self.maps
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

fn apply(maps: &mut Maps, name: &str, value: MetricValue) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::Invalid(MetricError::EmptyName));
    }
    match value {
        MetricValue::Gauge(v) => {
            maps.gauges.insert(name.to_string(), v);
        }
        MetricValue::Counter(d) => {
            let total = maps.counters.entry(name.to_string()).or_insert(0);
            *total = total.wrapping_add(d);
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn store_gauge(&self, name: &str, value: f64) -> Result<(), StoreError> {
        let mut maps = self.write()?;
        apply(&mut maps, name, MetricValue::Gauge(value))
    }

    async fn store_counter(&self, name: &str, delta: i64) -> Result<(), StoreError> {
        let mut maps = self.write()?;
        apply(&mut maps, name, MetricValue::Counter(delta))
    }

    async fn store_batch(&self, records: &[Metric]) -> Result<(), StoreError> {
        let mut maps = self.write()?;
        for record in records {
            apply(&mut maps, record.name(), record.value())?;
        }
        Ok(())
    }

    async fn gauge(&self, name: &str) -> Result<f64, StoreError> {
        self.read()?
            .gauges
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn counter(&self, name: &str) -> Result<i64, StoreError> {
        self.read()?
            .counters
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn metrics(&self) -> Result<Vec<Metric>, StoreError> {
        let maps = self.read()?;

        let mut gauges: Vec<_> = maps.gauges.iter().collect();
        gauges.sort_by(|a, b| a.0.cmp(b.0));
        let mut counters: Vec<_> = maps.counters.iter().collect();
        counters.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = Vec::with_capacity(gauges.len() + counters.len());
        for (name, value) in gauges {
            out.push(Metric::gauge(name.clone(), *value)?);
        }
        for (name, delta) in counters {
            out.push(Metric::counter(name.clone(), *delta)?);
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
