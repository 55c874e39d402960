use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ValuationConfig;
use crate::error::ProjectionError;
use crate::numeric::safe_divide;
use crate::statements::assembler::Period;
use crate::time_value::{annualize, irr, npv};
use crate::types::{Money, PeriodKind, Rate};
use crate::ProjectionResult;

const IRR_GUESS: Rate = rust_decimal_macros::dec!(0.10);
const METRIC_DP: u32 = 2;
const RATIO_DP: u32 = 6;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Valuation of the contract window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMetrics {
    pub discount_rate: Rate,
    /// Number of contract (dynamic) years valued
    pub contract_years: u32,
    pub npv_rent: Money,
    pub npv_ebitda: Money,
    /// IRR of the free-cash-flow series; absent when it has no root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    pub annualized_rent: Money,
    pub annualized_ebitda: Money,
    /// Annualized EBITDA less annualized rent
    pub net_annualized_value: Money,
    pub total_rent: Money,
    pub total_revenue: Money,
    pub total_ebitda: Money,
    pub rent_to_revenue: Rate,
    pub average_ebitda_margin: Rate,
    pub peak_debt: Money,
    pub ending_cash: Money,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Value the contract window of an emitted period sequence.
///
/// Discounting is end-of-year: the first contract year is discounted one
/// full period. Historical and transition years are ignored.
pub fn calculate_metrics(
    periods: &[Period],
    valuation: &ValuationConfig,
    warnings: &mut Vec<String>,
) -> ProjectionResult<ProjectionMetrics> {
    let contract: Vec<&Period> = periods
        .iter()
        .filter(|p| p.kind == PeriodKind::Dynamic)
        .collect();

    if contract.is_empty() {
        return Err(ProjectionError::InsufficientData(
            "No contract periods to value".into(),
        ));
    }

    let rate = valuation.discount_rate;
    let n = contract.len() as u32;

    let rents: Vec<Money> = contract
        .iter()
        .map(|p| p.profit_and_loss.rent_expense)
        .collect();
    let ebitdas: Vec<Money> = contract.iter().map(|p| p.profit_and_loss.ebitda).collect();
    let fcfs: Vec<Money> = contract
        .iter()
        .map(|p| p.cash_flow.operating_cash_flow + p.cash_flow.investing_cash_flow)
        .collect();

    let npv_rent = npv(rate, &rents)?;
    let npv_ebitda = npv(rate, &ebitdas)?;
    let annualized_rent = annualize(npv_rent, rate, n)?;
    let annualized_ebitda = annualize(npv_ebitda, rate, n)?;

    let irr = match irr(&fcfs, IRR_GUESS) {
        Ok(r) => Some(r.round_dp(RATIO_DP)),
        Err(e) => {
            log::warn!("IRR not available: {e}");
            warnings.push(format!("IRR not available: {e}"));
            None
        }
    };

    let total_rent: Money = rents.iter().sum();
    let total_ebitda: Money = ebitdas.iter().sum();
    let total_revenue: Money = contract
        .iter()
        .map(|p| p.profit_and_loss.total_revenue)
        .sum();
    let margin_sum: Rate = contract
        .iter()
        .map(|p| p.profit_and_loss.ebitda_margin)
        .sum();

    let peak_debt = contract
        .iter()
        .map(|p| p.balance_sheet.debt)
        .fold(Decimal::ZERO, Decimal::max);
    let ending_cash = contract
        .last()
        .map(|p| p.balance_sheet.cash)
        .unwrap_or(Decimal::ZERO);

    let annualized_rent = annualized_rent.round_dp(METRIC_DP);
    let annualized_ebitda = annualized_ebitda.round_dp(METRIC_DP);

    Ok(ProjectionMetrics {
        discount_rate: rate,
        contract_years: n,
        npv_rent: npv_rent.round_dp(METRIC_DP),
        npv_ebitda: npv_ebitda.round_dp(METRIC_DP),
        irr,
        annualized_rent,
        annualized_ebitda,
        net_annualized_value: annualized_ebitda - annualized_rent,
        total_rent,
        total_revenue,
        total_ebitda,
        rent_to_revenue: safe_divide(total_rent, total_revenue).round_dp(RATIO_DP),
        average_ebitda_margin: (margin_sum / Decimal::from(n)).round_dp(RATIO_DP),
        peak_debt,
        ending_cash,
    })
}
