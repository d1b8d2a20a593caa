use std::fmt;
use std::str::FromStr;

use crate::error::MetricError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, MetricError> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(MetricError::UnknownKind(other.to_string())),
        }
    }
}

/// The value half of a record. Gauges replace, counters accumulate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    pub fn kind(self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }
}

/// A validated metric record. Construction enforces the well-formedness
/// rules, so a `Metric` in hand always has a non-empty name and a value
/// matching its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    value: MetricValue,
}

impl Metric {
    pub fn gauge(name: impl Into<String>, value: f64) -> Result<Self, MetricError> {
        Self::new(name.into(), MetricValue::Gauge(value))
    }

    pub fn counter(name: impl Into<String>, delta: i64) -> Result<Self, MetricError> {
        Self::new(name.into(), MetricValue::Counter(delta))
    }

    pub fn new(name: String, value: MetricValue) -> Result<Self, MetricError> {
        if name.is_empty() {
            return Err(MetricError::EmptyName);
        }
        Ok(Self { name, value })
    }

    /// Parse the legacy path-parameter form, where the value arrives as a
    /// string and the kind decides how to read it.
    pub fn from_parts(kind: MetricKind, name: &str, raw: &str) -> Result<Self, MetricError> {
        let value = match kind {
            MetricKind::Gauge => MetricValue::Gauge(
                raw.parse::<f64>()
                    .map_err(|_| MetricError::InvalidGauge(raw.to_string()))?,
            ),
            MetricKind::Counter => MetricValue::Counter(
                raw.parse::<i64>()
                    .map_err(|_| MetricError::InvalidCounter(raw.to_string()))?,
            ),
        };
        Self::new(name.to_string(), value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> MetricValue {
        self.value
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert_eq!(
            "counter".parse::<MetricKind>().unwrap(),
            MetricKind::Counter
        );
        assert_eq!(MetricKind::Gauge.to_string(), "gauge");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "histogram".parse::<MetricKind>().unwrap_err();
        assert_eq!(err, MetricError::UnknownKind("histogram".to_string()));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(Metric::gauge("", 1.0).unwrap_err(), MetricError::EmptyName);
        assert_eq!(Metric::counter("", 1).unwrap_err(), MetricError::EmptyName);
    }

    #[test]
    fn from_parts_parses_by_kind() {
        let m = Metric::from_parts(MetricKind::Gauge, "temp", "42.5").unwrap();
        assert_eq!(m.value(), MetricValue::Gauge(42.5));

        let m = Metric::from_parts(MetricKind::Counter, "hits", "-4").unwrap();
        assert_eq!(m.value(), MetricValue::Counter(-4));
    }

    #[test]
    fn from_parts_rejects_mismatched_values() {
        let err = Metric::from_parts(MetricKind::Counter, "hits", "4.5").unwrap_err();
        assert_eq!(err, MetricError::InvalidCounter("4.5".to_string()));

        let err = Metric::from_parts(MetricKind::Gauge, "temp", "warm").unwrap_err();
        assert_eq!(err, MetricError::InvalidGauge("warm".to_string()));
    }
}
