use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::{safe_divide, NumericContext};
use crate::periods::OperatingLines;
use crate::statements::assembler::ProfitAndLoss;
use crate::types::{Money, Rate, Year};
use crate::ProjectionResult;

/// Cost lines that can be pinned flat in a transition year instead of
/// scaling with revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostLine {
    StaffCosts,
    OtherOpex,
}

/// A bridge year between the last historical year and the contract start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPeriodInput {
    pub year: Year,
    #[serde(default = "default_prefill")]
    pub prefill_from_prior: bool,
    pub revenue_growth_rate: Rate,
    /// Flat growth applied to the prior year's rent
    #[serde(default)]
    pub rent_growth_rate: Rate,
    #[serde(default)]
    pub fixed_cost_lines: Vec<CostLine>,
    /// Total revenue for the year when not pre-filled from the prior year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_override: Option<Money>,
}

fn default_prefill() -> bool {
    true
}

pub fn validate_transition(periods: &[TransitionPeriodInput]) -> ProjectionResult<()> {
    for p in periods {
        if p.revenue_growth_rate <= -Decimal::ONE {
            return Err(ProjectionError::config(
                ConfigErrorCode::NegativeAmount,
                format!(
                    "Transition year {}: revenue_growth_rate must be above -100%, got {}",
                    p.year, p.revenue_growth_rate
                ),
            ));
        }
        if !p.prefill_from_prior && p.revenue_override.is_none() {
            return Err(ProjectionError::config(
                ConfigErrorCode::MissingTransitionRevenue,
                format!(
                    "Transition year {} is not pre-filled and has no revenue_override",
                    p.year
                ),
            ));
        }
        if let Some(rev) = p.revenue_override {
            if rev < Decimal::ZERO {
                return Err(ProjectionError::config(
                    ConfigErrorCode::NegativeAmount,
                    format!("Transition year {}: revenue_override must be non-negative", p.year),
                ));
            }
        }
    }
    Ok(())
}

/// Grow the prior year's operating lines into a transition year.
///
/// Revenue grows by `revenue_growth_rate` (or is set by the override), keeping
/// the prior split between tuition and other revenue. Rent grows by its own
/// flat rate. Staff costs and other opex scale with revenue unless pinned.
pub fn project_transition(
    input: &TransitionPeriodInput,
    prior: &ProfitAndLoss,
    ctx: &NumericContext,
) -> ProjectionResult<OperatingLines> {
    let total_revenue = if input.prefill_from_prior {
        prior.total_revenue * (Decimal::ONE + input.revenue_growth_rate)
    } else {
        input.revenue_override.ok_or_else(|| {
            ProjectionError::config(
                ConfigErrorCode::MissingTransitionRevenue,
                format!("Transition year {} has no revenue source", input.year),
            )
        })?
    };
    let total_revenue = ctx.round(total_revenue);

    let other_share = safe_divide(prior.other_revenue, prior.total_revenue);
    let other_revenue = ctx.round(total_revenue * other_share);
    let tuition_revenue = total_revenue - other_revenue;

    // Ratio of this year's revenue to last year's; flat when last year had none.
    let scale = if prior.total_revenue.is_zero() {
        Decimal::ONE
    } else {
        total_revenue / prior.total_revenue
    };

    let staff_costs = if input.fixed_cost_lines.contains(&CostLine::StaffCosts) {
        prior.staff_costs
    } else {
        ctx.round(prior.staff_costs * scale)
    };
    let other_opex = if input.fixed_cost_lines.contains(&CostLine::OtherOpex) {
        prior.other_opex
    } else {
        ctx.round(prior.other_opex * scale)
    };

    let rent_expense = ctx.round(prior.rent_expense * (Decimal::ONE + input.rent_growth_rate));

    Ok(OperatingLines {
        year: input.year,
        tuition_revenue,
        other_revenue,
        total_revenue,
        rent_expense,
        staff_costs,
        other_opex,
    })
}
