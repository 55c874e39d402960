pub mod capex;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod numeric;
pub mod periods;
pub mod rent;
pub mod solver;
pub mod statements;
pub mod time_value;
pub mod types;
pub mod working_capital;

#[cfg(feature = "cache")]
pub mod cache;

#[cfg(feature = "parallel")]
pub mod batch;

pub use engine::{run_projection, run_with_timeout, CalculationEngineOutput, ProjectionInput};
pub use error::{ConfigErrorCode, ProjectionError};
pub use types::*;

/// Standard result type for all projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;
