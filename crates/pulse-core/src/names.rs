//! Metric names shared between the agent and anything that inspects its
//! output. Everything else the sampler emits is named at the sampling site.

pub const POLL_COUNT: &str = "PollCount";
pub const RANDOM_VALUE: &str = "RandomValue";
pub const TOTAL_MEMORY: &str = "TotalMemory";
pub const FREE_MEMORY: &str = "FreeMemory";
