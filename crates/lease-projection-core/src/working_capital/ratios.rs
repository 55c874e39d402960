use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::NumericContext;
use crate::periods::historical::HistoricalPeriodInput;
use crate::types::{Money, Rate};
use crate::ProjectionResult;

/// Decimal places kept on derived ratios.
const RATIO_DP: u32 = 8;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Balance-to-revenue ratios held constant over the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingCapitalRatios {
    /// Receivables / tuition revenue
    pub ar_percent: Rate,
    /// Prepaid expenses / tuition revenue
    pub prepaid_percent: Rate,
    /// Payables / tuition revenue
    pub ap_percent: Rate,
    /// Accrued expenses / tuition revenue
    pub accrued_percent: Rate,
    /// Deferred revenue / total revenue
    pub deferred_revenue_percent: Rate,
    /// Other revenue / tuition revenue
    pub other_revenue_ratio: Rate,
    /// Locked ratios are never re-derived
    pub locked: bool,
    /// Provenance: true when the ratios come from the last historical year
    pub calculated_from_base_year: bool,
}

impl Default for WorkingCapitalRatios {
    fn default() -> Self {
        WorkingCapitalRatios {
            ar_percent: Decimal::ZERO,
            prepaid_percent: Decimal::ZERO,
            ap_percent: Decimal::ZERO,
            accrued_percent: Decimal::ZERO,
            deferred_revenue_percent: Decimal::ZERO,
            other_revenue_ratio: Decimal::ZERO,
            locked: false,
            calculated_from_base_year: true,
        }
    }
}

/// Projected closing working-capital balances for one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalBalances {
    pub receivables: Money,
    pub prepaid: Money,
    pub payables: Money,
    pub accrued: Money,
    pub deferred_revenue: Money,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive ratios from one historical year. Tuition (revenue less other
/// revenue) is the base for everything except deferred revenue, which is
/// measured against total revenue.
pub fn derive_ratios(base_year: &HistoricalPeriodInput) -> ProjectionResult<WorkingCapitalRatios> {
    let pl = &base_year.profit_and_loss;
    let bs = &base_year.balance_sheet;
    let tuition = pl.tuition_revenue();

    if tuition <= Decimal::ZERO || pl.revenue <= Decimal::ZERO {
        return Err(ProjectionError::config(
            ConfigErrorCode::ZeroBaseRevenue,
            format!(
                "Historical year {} has no tuition revenue to derive working-capital ratios from",
                base_year.year
            ),
        ));
    }

    let ratio = |value: Money, base: Money| (value / base).round_dp(RATIO_DP);

    Ok(WorkingCapitalRatios {
        ar_percent: ratio(bs.receivables, tuition),
        prepaid_percent: ratio(bs.prepaid, tuition),
        ap_percent: ratio(bs.payables, tuition),
        accrued_percent: ratio(bs.accrued, tuition),
        deferred_revenue_percent: ratio(bs.deferred_revenue, pl.revenue),
        other_revenue_ratio: ratio(pl.other_revenue, tuition),
        locked: false,
        calculated_from_base_year: true,
    })
}

/// Pick the ratios a run will use.
///
/// Locked ratios are kept as supplied. Unlocked ratios flagged
/// `calculated_from_base_year` are re-derived from the final historical year;
/// unlocked manual ratios are kept as supplied.
pub fn resolve_ratios(
    supplied: &WorkingCapitalRatios,
    historical: &[HistoricalPeriodInput],
) -> ProjectionResult<WorkingCapitalRatios> {
    if supplied.locked || !supplied.calculated_from_base_year {
        return Ok(supplied.clone());
    }

    let base = historical.last().ok_or_else(|| {
        ProjectionError::config(
            ConfigErrorCode::MissingHistorical,
            "Working-capital ratios cannot be derived without a historical period",
        )
    })?;
    derive_ratios(base)
}

/// Constant-ratio projection of closing balances.
pub fn project_balances(
    ratios: &WorkingCapitalRatios,
    tuition_revenue: Money,
    total_revenue: Money,
    ctx: &NumericContext,
) -> WorkingCapitalBalances {
    WorkingCapitalBalances {
        receivables: ctx.round(tuition_revenue * ratios.ar_percent),
        prepaid: ctx.round(tuition_revenue * ratios.prepaid_percent),
        payables: ctx.round(tuition_revenue * ratios.ap_percent),
        accrued: ctx.round(tuition_revenue * ratios.accrued_percent),
        deferred_revenue: ctx.round(total_revenue * ratios.deferred_revenue_percent),
    }
}
