use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capex::scheduler::{CapExConfig, HistoricalCapexState};
use crate::config::{
    CircularSolverConfig, SystemConfiguration, ValidationConfig, ValuationConfig,
};
use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::NumericContext;
use crate::periods::dynamic::{validate_dynamic, DynamicPeriodInput};
use crate::periods::historical::{validate_historical, HistoricalPeriodInput};
use crate::periods::transition::{validate_transition, TransitionPeriodInput};
use crate::types::{ContractWindow, Year};
use crate::working_capital::ratios::{resolve_ratios, WorkingCapitalRatios};
use crate::ProjectionResult;

/// Highest accepted valuation discount rate (100%).
const MAX_DISCOUNT_RATE: Decimal = Decimal::ONE;

/// Immutable snapshot of everything one projection run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInput {
    #[serde(default)]
    pub system: SystemConfiguration,
    #[serde(default)]
    pub numeric: NumericContext,
    pub historical: Vec<HistoricalPeriodInput>,
    #[serde(default)]
    pub transition: Vec<TransitionPeriodInput>,
    #[serde(default)]
    pub working_capital: WorkingCapitalRatios,
    pub contract: ContractWindow,
    pub dynamic: DynamicPeriodInput,
    #[serde(default)]
    pub capex: CapExConfig,
    #[serde(default)]
    pub solver: CircularSolverConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
}

impl ProjectionInput {
    /// Reject any configuration problem before a single period is computed.
    pub fn validate(&self) -> ProjectionResult<()> {
        self.system.validate()?;
        self.solver.validate()?;
        validate_historical(&self.historical)?;
        validate_transition(&self.transition)?;
        self.validate_timeline()?;
        validate_dynamic(&self.dynamic)?;
        self.capex.validate()?;
        resolve_ratios(&self.working_capital, &self.historical)?;

        if self.validation.balance_tolerance < Decimal::ZERO {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidSystemConfig,
                "balance_tolerance must be non-negative",
            ));
        }
        let rate = self.valuation.discount_rate;
        if rate <= -Decimal::ONE || rate > MAX_DISCOUNT_RATE {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidSystemConfig,
                format!("discount_rate must be above -100% and at most 100%, got {rate}"),
            ));
        }
        Ok(())
    }

    /// Years run historical -> transition -> contract with no gaps.
    fn validate_timeline(&self) -> ProjectionResult<()> {
        let mut last: Year = match self.historical.last() {
            Some(h) => h.year,
            None => {
                return Err(ProjectionError::config(
                    ConfigErrorCode::MissingHistorical,
                    "At least one historical period is required",
                ))
            }
        };

        for t in &self.transition {
            if t.year != last + 1 {
                return Err(ProjectionError::config(
                    ConfigErrorCode::NonContiguousYears,
                    format!("Transition year {} does not follow year {last}", t.year),
                ));
            }
            last = t.year;
        }

        if self.contract.end_year < self.contract.start_year {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidContractWindow,
                format!(
                    "Contract end year {} precedes start year {}",
                    self.contract.end_year, self.contract.start_year
                ),
            ));
        }
        if self.contract.start_year != last + 1 {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidContractWindow,
                format!(
                    "Contract must start in {}, the year after the last historical/transition year; got {}",
                    last + 1,
                    self.contract.start_year
                ),
            ));
        }
        Ok(())
    }

    /// The pre-contract depreciation base: supplied, or read off the last
    /// historical year.
    pub fn historical_capex_state(&self) -> HistoricalCapexState {
        if let Some(state) = &self.capex.historical_state {
            return state.clone();
        }
        match self.historical.last() {
            Some(h) => HistoricalCapexState {
                gross_ppe: h.balance_sheet.gross_ppe,
                accumulated_depreciation: h.balance_sheet.accumulated_depreciation,
                annual_depreciation: h.profit_and_loss.depreciation,
                remaining_to_depreciate: h.balance_sheet.net_ppe().max(Decimal::ZERO),
            },
            None => HistoricalCapexState::default(),
        }
    }

    /// Capex configuration with the historical base filled in.
    pub fn seeded_capex(&self) -> CapExConfig {
        CapExConfig {
            historical_state: Some(self.historical_capex_state()),
            ..self.capex.clone()
        }
    }
}
