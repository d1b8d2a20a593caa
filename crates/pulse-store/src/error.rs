use pulse_core::MetricError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("metric not found: {0}")]
    NotFound(String),

    #[error("invalid metric: {0}")]
    Invalid(#[from] MetricError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
