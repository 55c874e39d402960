pub mod input;
pub mod projection;

pub use input::ProjectionInput;
pub use projection::{run_projection, run_with_timeout, CalculationEngineOutput, PerformanceRecord};
