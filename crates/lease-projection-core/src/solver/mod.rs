pub mod circular;

pub use circular::{
    CircularSolver, FinancingResolution, InterestEstimate, SolverState, YearDrivers,
};
