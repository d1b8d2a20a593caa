#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    #[error("metric name is empty")]
    EmptyName,

    #[error("unknown metric kind: {0}")]
    UnknownKind(String),

    #[error("counter record carries no delta")]
    MissingCounter,

    #[error("gauge record carries no value")]
    MissingGauge,

    #[error("record carries both delta and value")]
    ConflictingValues,

    #[error("invalid gauge value: {0}")]
    InvalidGauge(String),

    #[error("invalid counter value: {0}")]
    InvalidCounter(String),
}
