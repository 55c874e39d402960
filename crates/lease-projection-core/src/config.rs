use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::DEFAULT_ZAKAT_RATE;
use crate::types::{Money, Rate};
use crate::ProjectionResult;

// ---------------------------------------------------------------------------
// System-wide rates
// ---------------------------------------------------------------------------

/// Process-wide numeric configuration, read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfiguration {
    /// Zakat rate applied to positive pre-zakat earnings
    pub zakat_rate: Rate,
    /// Interest rate on average plug-debt balance
    pub debt_interest_rate: Rate,
    /// Interest earned on average cash above the minimum balance
    pub deposit_interest_rate: Rate,
    /// Cash floor; shortfalls below it are funded with plug debt
    pub min_cash_balance: Money,
}

impl Default for SystemConfiguration {
    fn default() -> Self {
        SystemConfiguration {
            zakat_rate: DEFAULT_ZAKAT_RATE,
            debt_interest_rate: dec!(0.05),
            deposit_interest_rate: dec!(0.02),
            min_cash_balance: dec!(1000000),
        }
    }
}

impl SystemConfiguration {
    pub fn validate(&self) -> ProjectionResult<()> {
        validate_unit_rate("zakat_rate", self.zakat_rate)?;
        validate_unit_rate("debt_interest_rate", self.debt_interest_rate)?;
        validate_unit_rate("deposit_interest_rate", self.deposit_interest_rate)?;
        if self.min_cash_balance < Decimal::ZERO {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidSystemConfig,
                format!(
                    "min_cash_balance must be non-negative, got {}",
                    self.min_cash_balance
                ),
            ));
        }
        Ok(())
    }
}

fn validate_unit_rate(field: &str, value: Rate) -> ProjectionResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidSystemConfig,
            format!("{field} must be between 0 and 1, got {value}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularSolverConfig {
    pub max_iterations: u32,
    /// Absolute tolerance in currency units on the interest estimate
    pub convergence_tolerance: Money,
    /// Damping coefficient in (0, 1]; 1 means undamped
    pub relaxation_factor: Rate,
}

impl Default for CircularSolverConfig {
    fn default() -> Self {
        CircularSolverConfig {
            max_iterations: 50,
            convergence_tolerance: dec!(0.01),
            relaxation_factor: Decimal::ONE,
        }
    }
}

impl CircularSolverConfig {
    pub fn validate(&self) -> ProjectionResult<()> {
        if self.max_iterations == 0 {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidSolverConfig,
                "max_iterations must be at least 1",
            ));
        }
        if self.convergence_tolerance <= Decimal::ZERO {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidSolverConfig,
                format!(
                    "convergence_tolerance must be positive, got {}",
                    self.convergence_tolerance
                ),
            ));
        }
        if self.relaxation_factor <= Decimal::ZERO || self.relaxation_factor > Decimal::ONE {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidSolverConfig,
                format!(
                    "relaxation_factor must be in (0, 1], got {}",
                    self.relaxation_factor
                ),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation / valuation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Max |Assets - (Liabilities + Equity)| and cash reconciliation gap
    pub balance_tolerance: Money,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            balance_tolerance: dec!(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub discount_rate: Rate,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        ValuationConfig {
            discount_rate: dec!(0.08),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SystemConfiguration::default().validate().is_ok());
        assert!(CircularSolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_relaxation_out_of_range_rejected() {
        let cfg = CircularSolverConfig {
            relaxation_factor: dec!(1.2),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_SOLVER_CONFIG");

        let cfg = CircularSolverConfig {
            relaxation_factor: Decimal::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let cfg = CircularSolverConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_min_cash_rejected() {
        let cfg = SystemConfiguration {
            min_cash_balance: dec!(-1),
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().code(), "INVALID_SYSTEM_CONFIG");
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let cfg: SystemConfiguration =
            serde_json::from_str(r#"{"zakat_rate": "0.03"}"#).unwrap();
        assert_eq!(cfg.zakat_rate, dec!(0.03));
        assert_eq!(cfg.debt_interest_rate, dec!(0.05));
    }
}
