use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable reason attached to a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigErrorCode {
    MissingHistorical,
    NonContiguousYears,
    InvalidContractWindow,
    NonPositiveEnrollment,
    InvalidRampCurve,
    InvalidGradeDistribution,
    InvalidCurriculum,
    InvalidStaffConfig,
    InvalidOpexPercent,
    InvalidRentParams,
    InvalidCapexConfig,
    UnknownAssetCategory,
    ZeroBaseRevenue,
    MissingTransitionRevenue,
    InvalidSolverConfig,
    InvalidSystemConfig,
    InvalidHistoricalPeriod,
    NegativeAmount,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorCode::MissingHistorical => "MISSING_HISTORICAL",
            ConfigErrorCode::NonContiguousYears => "NON_CONTIGUOUS_YEARS",
            ConfigErrorCode::InvalidContractWindow => "INVALID_CONTRACT_WINDOW",
            ConfigErrorCode::NonPositiveEnrollment => "NON_POSITIVE_ENROLLMENT",
            ConfigErrorCode::InvalidRampCurve => "INVALID_RAMP_CURVE",
            ConfigErrorCode::InvalidGradeDistribution => "INVALID_GRADE_DISTRIBUTION",
            ConfigErrorCode::InvalidCurriculum => "INVALID_CURRICULUM",
            ConfigErrorCode::InvalidStaffConfig => "INVALID_STAFF_CONFIG",
            ConfigErrorCode::InvalidOpexPercent => "INVALID_OPEX_PERCENT",
            ConfigErrorCode::InvalidRentParams => "INVALID_RENT_PARAMS",
            ConfigErrorCode::InvalidCapexConfig => "INVALID_CAPEX_CONFIG",
            ConfigErrorCode::UnknownAssetCategory => "UNKNOWN_ASSET_CATEGORY",
            ConfigErrorCode::ZeroBaseRevenue => "ZERO_BASE_REVENUE",
            ConfigErrorCode::MissingTransitionRevenue => "MISSING_TRANSITION_REVENUE",
            ConfigErrorCode::InvalidSolverConfig => "INVALID_SOLVER_CONFIG",
            ConfigErrorCode::InvalidSystemConfig => "INVALID_SYSTEM_CONFIG",
            ConfigErrorCode::InvalidHistoricalPeriod => "INVALID_HISTORICAL_PERIOD",
            ConfigErrorCode::NegativeAmount => "NEGATIVE_AMOUNT",
        }
    }
}

impl std::fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Configuration error [{code}]: {message}")]
    Configuration {
        code: ConfigErrorCode,
        message: String,
    },

    #[error("Convergence failure: year {year} did not converge after {iterations} iterations (delta: {last_delta})")]
    Convergence {
        year: i32,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Timeout: calculation exceeded {budget_ms} ms (elapsed {elapsed_ms} ms)")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProjectionError {
    pub fn config(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        ProjectionError::Configuration {
            code,
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ProjectionError::Configuration { .. })
    }

    pub fn is_convergence(&self) -> bool {
        matches!(self, ProjectionError::Convergence { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProjectionError::Timeout { .. })
    }

    /// Stable code for callers that branch on the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ProjectionError::Configuration { code, .. } => code.as_str(),
            ProjectionError::Convergence { .. } => "CONVERGENCE_FAILURE",
            ProjectionError::Timeout { .. } => "TIMEOUT",
            ProjectionError::InvalidInput { .. } => "INVALID_INPUT",
            ProjectionError::InsufficientData(_) => "INSUFFICIENT_DATA",
            ProjectionError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for ProjectionError {
    fn from(e: serde_json::Error) -> Self {
        ProjectionError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_kinds_are_distinguishable() {
        let config = ProjectionError::config(ConfigErrorCode::NonPositiveEnrollment, "x");
        let conv = ProjectionError::Convergence {
            year: 2030,
            iterations: 5,
            last_delta: dec!(12.5),
        };
        let timeout = ProjectionError::Timeout {
            elapsed_ms: 20,
            budget_ms: 10,
        };

        assert!(config.is_configuration() && !config.is_convergence());
        assert!(conv.is_convergence() && !conv.is_timeout());
        assert!(timeout.is_timeout() && !timeout.is_configuration());
        assert_eq!(config.code(), "NON_POSITIVE_ENROLLMENT");
        assert_eq!(conv.code(), "CONVERGENCE_FAILURE");
        assert_eq!(timeout.code(), "TIMEOUT");
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ConfigErrorCode::ZeroBaseRevenue).unwrap();
        assert_eq!(json, "\"ZERO_BASE_REVENUE\"");
    }

    #[test]
    fn test_display_includes_code() {
        let err = ProjectionError::config(ConfigErrorCode::InvalidRentParams, "frequency must be >= 1");
        assert_eq!(
            err.to_string(),
            "Configuration error [INVALID_RENT_PARAMS]: frequency must be >= 1"
        );
    }
}
