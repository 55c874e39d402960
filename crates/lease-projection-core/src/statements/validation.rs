use serde::{Deserialize, Serialize};

use crate::statements::assembler::{CashFlowBasis, Period};
use crate::types::{Money, Year};

/// Outcome of the two accounting checks for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCheck {
    pub year: Year,
    /// Assets - (Liabilities + Equity)
    pub balance_difference: Money,
    pub balanced: bool,
    /// beginning + CFO + CFI + CFF - ending
    pub cash_flow_difference: Money,
    pub cash_flow_reconciled: bool,
    /// False when the period has no cash-flow statement to reconcile
    pub cash_flow_checked: bool,
}

/// Run-level validation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub all_periods_balanced: bool,
    pub all_cash_flows_reconciled: bool,
    pub tolerance: Money,
    pub checks: Vec<PeriodCheck>,
}

/// Check one period against the accounting identity and the cash
/// reconciliation. Nothing is corrected; the gaps are reported as-is.
pub fn validate_period(period: &Period, tolerance: Money) -> PeriodCheck {
    let bs = &period.balance_sheet;
    let cf = &period.cash_flow;

    let balance_difference = bs.total_assets - bs.total_liabilities_and_equity;

    let cash_flow_checked = cf.basis != CashFlowBasis::Unavailable;
    let cash_flow_difference = cf.beginning_cash
        + cf.operating_cash_flow
        + cf.investing_cash_flow
        + cf.financing_cash_flow
        - cf.ending_cash;

    PeriodCheck {
        year: period.year,
        balance_difference,
        balanced: balance_difference.abs() <= tolerance,
        cash_flow_difference,
        cash_flow_reconciled: !cash_flow_checked || cash_flow_difference.abs() <= tolerance,
        cash_flow_checked,
    }
}

/// Fold per-period checks into the run-level record, pushing one warning per
/// failed check.
pub fn summarize(
    checks: Vec<PeriodCheck>,
    tolerance: Money,
    warnings: &mut Vec<String>,
) -> ValidationRecord {
    for c in &checks {
        if !c.balanced {
            log::warn!(
                "year {}: balance sheet out of balance by {}",
                c.year,
                c.balance_difference
            );
            warnings.push(format!(
                "Year {}: assets differ from liabilities + equity by {} (tolerance {tolerance})",
                c.year, c.balance_difference
            ));
        }
        if !c.cash_flow_reconciled {
            log::warn!(
                "year {}: cash flow does not reconcile by {}",
                c.year,
                c.cash_flow_difference
            );
            warnings.push(format!(
                "Year {}: cash flow does not reconcile to ending cash by {} (tolerance {tolerance})",
                c.year, c.cash_flow_difference
            ));
        }
    }

    ValidationRecord {
        all_periods_balanced: checks.iter().all(|c| c.balanced),
        all_cash_flows_reconciled: checks.iter().all(|c| c.cash_flow_reconciled),
        tolerance,
        checks,
    }
}
