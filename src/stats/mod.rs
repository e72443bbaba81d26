//! Pipeline observability counters

pub mod metrics;

pub use metrics::{PipelineMetrics, PipelineStats};
