use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::statements::assembler::BalanceSnapshot;
use crate::types::{Money, Year};
use crate::ProjectionResult;

/// A fiscal year that already happened. Read-only ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPeriodInput {
    pub year: Year,
    #[serde(default = "default_immutable")]
    pub immutable: bool,
    pub profit_and_loss: ProfitAndLossSnapshot,
    pub balance_sheet: BalanceSnapshot,
}

fn default_immutable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLossSnapshot {
    /// Total revenue, other revenue included
    pub revenue: Money,
    /// Non-tuition part of `revenue`
    #[serde(default)]
    pub other_revenue: Money,
    pub rent: Money,
    pub staff_costs: Money,
    pub other_opex: Money,
    pub depreciation: Money,
    /// Net interest expense
    pub interest: Money,
    pub zakat: Money,
}

impl ProfitAndLossSnapshot {
    pub fn tuition_revenue(&self) -> Money {
        self.revenue - self.other_revenue
    }

    pub fn ebitda(&self) -> Money {
        self.revenue - self.rent - self.staff_costs - self.other_opex
    }
}

/// Check the historical block: present, strictly consecutive years, and no
/// negative amounts where a negative value has no meaning.
pub fn validate_historical(periods: &[HistoricalPeriodInput]) -> ProjectionResult<()> {
    if periods.is_empty() {
        return Err(ProjectionError::config(
            ConfigErrorCode::MissingHistorical,
            "At least one historical period is required to seed opening balances",
        ));
    }

    for pair in periods.windows(2) {
        if pair[1].year != pair[0].year + 1 {
            return Err(ProjectionError::config(
                ConfigErrorCode::NonContiguousYears,
                format!(
                    "Historical year {} is followed by {}; years must increase by one",
                    pair[0].year, pair[1].year
                ),
            ));
        }
    }

    for p in periods {
        let pl = &p.profit_and_loss;
        let bs = &p.balance_sheet;
        let non_negative = [
            ("revenue", pl.revenue),
            ("other_revenue", pl.other_revenue),
            ("rent", pl.rent),
            ("staff_costs", pl.staff_costs),
            ("other_opex", pl.other_opex),
            ("depreciation", pl.depreciation),
            ("zakat", pl.zakat),
            ("receivables", bs.receivables),
            ("prepaid", bs.prepaid),
            ("gross_ppe", bs.gross_ppe),
            ("accumulated_depreciation", bs.accumulated_depreciation),
            ("payables", bs.payables),
            ("accrued", bs.accrued),
            ("deferred_revenue", bs.deferred_revenue),
            ("debt", bs.debt),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(ProjectionError::config(
                    ConfigErrorCode::InvalidHistoricalPeriod,
                    format!("Historical year {}: {field} must be non-negative, got {value}", p.year),
                ));
            }
        }
        if pl.other_revenue > pl.revenue {
            return Err(ProjectionError::config(
                ConfigErrorCode::InvalidHistoricalPeriod,
                format!(
                    "Historical year {}: other_revenue ({}) exceeds total revenue ({})",
                    p.year, pl.other_revenue, pl.revenue
                ),
            ));
        }
    }

    Ok(())
}

/// Warnings for historical years not flagged immutable. They are still
/// passed through untouched.
pub fn mutability_warnings(periods: &[HistoricalPeriodInput]) -> Vec<String> {
    periods
        .iter()
        .filter(|p| !p.immutable)
        .map(|p| {
            format!(
                "Historical year {} is not flagged immutable; treated as read-only",
                p.year
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_period(year: Year) -> HistoricalPeriodInput {
        HistoricalPeriodInput {
            year,
            immutable: true,
            profit_and_loss: ProfitAndLossSnapshot {
                revenue: dec!(50000000),
                other_revenue: dec!(2000000),
                rent: dec!(8000000),
                staff_costs: dec!(25000000),
                other_opex: dec!(7000000),
                depreciation: dec!(1500000),
                interest: dec!(0),
                zakat: dec!(200000),
            },
            balance_sheet: BalanceSnapshot {
                cash: dec!(5000000),
                receivables: dec!(2400000),
                prepaid: dec!(480000),
                gross_ppe: dec!(30000000),
                accumulated_depreciation: dec!(12000000),
                payables: dec!(1920000),
                accrued: dec!(960000),
                deferred_revenue: dec!(6000000),
                debt: dec!(0),
                equity: dec!(17000000),
            },
        }
    }

    #[test]
    fn test_valid_history_accepted() {
        let periods = vec![sample_period(2022), sample_period(2023), sample_period(2024)];
        assert!(validate_historical(&periods).is_ok());
    }

    #[test]
    fn test_empty_history_rejected() {
        let err = validate_historical(&[]).unwrap_err();
        assert_eq!(err.code(), "MISSING_HISTORICAL");
    }

    #[test]
    fn test_gap_in_years_rejected() {
        let periods = vec![sample_period(2022), sample_period(2024)];
        let err = validate_historical(&periods).unwrap_err();
        assert_eq!(err.code(), "NON_CONTIGUOUS_YEARS");
    }

    #[test]
    fn test_negative_receivables_rejected() {
        let mut p = sample_period(2024);
        p.balance_sheet.receivables = dec!(-1);
        let err = validate_historical(&[p]).unwrap_err();
        assert_eq!(err.code(), "INVALID_HISTORICAL_PERIOD");
    }

    #[test]
    fn test_mutable_year_warns() {
        let mut p = sample_period(2024);
        p.immutable = false;
        let warnings = mutability_warnings(&[p]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("2024"));
    }

    #[test]
    fn test_tuition_excludes_other_revenue() {
        let p = sample_period(2024);
        assert_eq!(p.profit_and_loss.tuition_revenue(), dec!(48000000));
        assert_eq!(p.profit_and_loss.ebitda(), dec!(10000000));
    }

    #[test]
    fn test_immutable_defaults_true() {
        let json = r#"{
            "year": 2024,
            "profit_and_loss": {"revenue": "100", "rent": "10", "staff_costs": "50",
                "other_opex": "10", "depreciation": "5", "interest": "0", "zakat": "1"},
            "balance_sheet": {"cash": "10", "receivables": "0", "prepaid": "0",
                "gross_ppe": "0", "accumulated_depreciation": "0", "payables": "0",
                "accrued": "0", "deferred_revenue": "0", "debt": "0", "equity": "10"}
        }"#;
        let p: HistoricalPeriodInput = serde_json::from_str(json).unwrap();
        assert!(p.immutable);
        assert_eq!(p.profit_and_loss.other_revenue, Decimal::ZERO);
    }
}
