pub mod assembler;
pub mod validation;

pub use assembler::{
    BalanceSheet, BalanceSnapshot, CashFlowBasis, CashFlowStatement, Period, ProfitAndLoss,
    SolverTrace,
};
pub use validation::{PeriodCheck, ValidationRecord};
