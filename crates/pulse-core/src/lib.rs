mod error;
mod metric;
mod names;
mod wire;

pub use error::MetricError;
pub use metric::{Metric, MetricKind, MetricValue};
pub use names::{FREE_MEMORY, POLL_COUNT, RANDOM_VALUE, TOTAL_MEMORY};
pub use wire::MetricPayload;
