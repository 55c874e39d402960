//! Interest / cash / plug-debt fixed point for one projected year.
//!
//! Interest depends on the average debt balance, debt depends on the cash
//! shortfall, and cash depends on net income after interest. The solver
//! carries an interest estimate through an explicit state machine: evaluate
//! the year at the estimate, recompute interest from the resulting balances,
//! and stop once the two agree within tolerance. Relaxation damps the update
//! for oscillating cases.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::{CircularSolverConfig, SystemConfiguration};
use crate::deadline::Deadline;
use crate::error::ProjectionError;
use crate::statements::assembler::BalanceSnapshot;
use crate::types::{Money, Year};
use crate::working_capital::ratios::WorkingCapitalBalances;
use crate::ProjectionResult;

/// Everything about a year that does not depend on financing.
#[derive(Debug, Clone, PartialEq)]
pub struct YearDrivers {
    pub year: Year,
    /// EBITDA less depreciation
    pub ebit: Money,
    pub depreciation: Money,
    pub capex: Money,
    /// Closing working-capital balances
    pub working_capital: WorkingCapitalBalances,
    /// Prior period's closing balances
    pub opening: BalanceSnapshot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestEstimate {
    pub expense: Money,
    pub income: Money,
}

impl InterestEstimate {
    pub fn net(&self) -> Money {
        self.expense - self.income
    }

    fn distance(&self, other: &InterestEstimate) -> Money {
        (self.expense - other.expense)
            .abs()
            .max((self.income - other.income).abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverState {
    pub iteration: u32,
    pub estimate: InterestEstimate,
    pub last_residual: Option<Money>,
}

/// Converged financing outcome of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingResolution {
    pub interest_expense: Money,
    pub interest_income: Money,
    pub ebt: Money,
    pub zakat: Money,
    pub net_income: Money,
    pub operating_cash_flow: Money,
    pub debt_drawn: Money,
    pub debt_repaid: Money,
    pub closing_debt: Money,
    pub ending_cash: Money,
    pub iterations: u32,
    pub residual: Money,
}

enum Step {
    Converged(FinancingResolution),
    Continue(SolverState),
}

pub struct CircularSolver<'a> {
    system: &'a SystemConfiguration,
    config: &'a CircularSolverConfig,
    deadline: Option<Deadline>,
}

impl<'a> CircularSolver<'a> {
    pub fn new(system: &'a SystemConfiguration, config: &'a CircularSolverConfig) -> Self {
        CircularSolver {
            system,
            config,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Resolve the year starting from `initial` (normally the prior
    /// period's interest).
    pub fn solve(
        &self,
        drivers: &YearDrivers,
        initial: InterestEstimate,
    ) -> ProjectionResult<FinancingResolution> {
        let mut state = SolverState {
            iteration: 0,
            estimate: initial,
            last_residual: None,
        };

        loop {
            if let Some(deadline) = &self.deadline {
                deadline.check()?;
            }
            if state.iteration >= self.config.max_iterations {
                let last_delta = state.last_residual.unwrap_or(Decimal::ZERO);
                log::warn!(
                    "year {}: no convergence after {} iterations (delta {last_delta})",
                    drivers.year,
                    state.iteration
                );
                return Err(ProjectionError::Convergence {
                    year: drivers.year,
                    iterations: state.iteration,
                    last_delta,
                });
            }

            state = match self.step(drivers, state) {
                Step::Converged(resolution) => {
                    log::trace!(
                        "year {} converged in {} iterations",
                        drivers.year,
                        resolution.iterations
                    );
                    return Ok(resolution);
                }
                Step::Continue(next) => next,
            };
        }
    }

    fn step(&self, drivers: &YearDrivers, state: SolverState) -> Step {
        let iteration = state.iteration + 1;
        let (resolution, computed) = self.evaluate(drivers, &state.estimate);
        let residual = computed.distance(&state.estimate);

        if residual <= self.config.convergence_tolerance {
            return Step::Converged(FinancingResolution {
                iterations: iteration,
                residual,
                ..resolution
            });
        }

        let lambda = self.config.relaxation_factor;
        let relax = |old: Money, new: Money| old + lambda * (new - old);
        Step::Continue(SolverState {
            iteration,
            estimate: InterestEstimate {
                expense: relax(state.estimate.expense, computed.expense),
                income: relax(state.estimate.income, computed.income),
            },
            last_residual: Some(residual),
        })
    }

    /// Evaluate the year at `estimate`. Returns the resulting financing
    /// position and the interest it implies.
    fn evaluate(
        &self,
        d: &YearDrivers,
        estimate: &InterestEstimate,
    ) -> (FinancingResolution, InterestEstimate) {
        let sys = self.system;
        let opening = &d.opening;
        let wc = &d.working_capital;

        let ebt = d.ebit - estimate.expense + estimate.income;
        let zakat = if ebt > Decimal::ZERO {
            ebt * sys.zakat_rate
        } else {
            Decimal::ZERO
        };
        let net_income = ebt - zakat;

        let operating_cash_flow = net_income + d.depreciation
            - (wc.receivables - opening.receivables)
            - (wc.prepaid - opening.prepaid)
            + (wc.payables - opening.payables)
            + (wc.accrued - opening.accrued)
            + (wc.deferred_revenue - opening.deferred_revenue);

        let preliminary_cash = opening.cash + operating_cash_flow - d.capex;

        let (debt_drawn, debt_repaid) = if preliminary_cash < sys.min_cash_balance {
            (sys.min_cash_balance - preliminary_cash, Decimal::ZERO)
        } else {
            let excess = preliminary_cash - sys.min_cash_balance;
            (Decimal::ZERO, excess.min(opening.debt.max(Decimal::ZERO)))
        };
        let closing_debt = (opening.debt + debt_drawn - debt_repaid).max(Decimal::ZERO);
        let ending_cash = preliminary_cash + debt_drawn - debt_repaid;

        let computed_expense = sys.debt_interest_rate * (opening.debt + closing_debt) / dec!(2);
        let computed_income = if closing_debt.is_zero() && ending_cash > sys.min_cash_balance {
            let surplus_open = (opening.cash - sys.min_cash_balance).max(Decimal::ZERO);
            let surplus_close = ending_cash - sys.min_cash_balance;
            sys.deposit_interest_rate * (surplus_open + surplus_close) / dec!(2)
        } else {
            Decimal::ZERO
        };

        (
            FinancingResolution {
                interest_expense: estimate.expense,
                interest_income: estimate.income,
                ebt,
                zakat,
                net_income,
                operating_cash_flow,
                debt_drawn,
                debt_repaid,
                closing_debt,
                ending_cash,
                iterations: 0,
                residual: Decimal::ZERO,
            },
            InterestEstimate {
                expense: computed_expense,
                income: computed_income,
            },
        )
    }
}
