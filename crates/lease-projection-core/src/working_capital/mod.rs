pub mod ratios;

pub use ratios::{
    derive_ratios, project_balances, resolve_ratios, WorkingCapitalBalances, WorkingCapitalRatios,
};
