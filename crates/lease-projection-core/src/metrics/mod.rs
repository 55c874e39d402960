pub mod valuation;

pub use valuation::{calculate_metrics, ProjectionMetrics};
