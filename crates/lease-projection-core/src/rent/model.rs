use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, ProjectionError};
use crate::numeric::{safe_divide, step_escalation, NumericContext};
use crate::time_value::annuity_payment;
use crate::types::{ContractWindow, Money, Rate, Year};
use crate::ProjectionResult;

/// Lease rent model. Exactly one variant per proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RentParams {
    /// `base_rent * (1 + growth_rate)^floor(elapsed / frequency)`
    FixedEscalation {
        base_rent: Money,
        growth_rate: Rate,
        frequency: u32,
    },
    /// Fraction of the year's total revenue, uncapped
    RevenueShare { revenue_share_percent: Rate },
    /// Annuity on the landlord's land and build capital, then stepped like
    /// fixed escalation
    PartnerInvestment {
        land_size: Decimal,
        land_price_per_sqm: Money,
        bua_size: Decimal,
        construction_cost_per_sqm: Money,
        yield_rate: Rate,
        growth_rate: Rate,
        frequency: u32,
    },
}

impl RentParams {
    pub fn validate(&self) -> ProjectionResult<()> {
        match self {
            RentParams::FixedEscalation {
                base_rent,
                growth_rate,
                frequency,
            } => {
                non_negative("base_rent", *base_rent)?;
                growth_above_floor(*growth_rate)?;
                positive_frequency(*frequency)
            }
            RentParams::RevenueShare {
                revenue_share_percent,
            } => {
                if *revenue_share_percent < Decimal::ZERO || *revenue_share_percent > Decimal::ONE {
                    return Err(ProjectionError::config(
                        ConfigErrorCode::InvalidRentParams,
                        format!(
                            "revenue_share_percent must be between 0 and 1, got {revenue_share_percent}"
                        ),
                    ));
                }
                Ok(())
            }
            RentParams::PartnerInvestment {
                land_size,
                land_price_per_sqm,
                bua_size,
                construction_cost_per_sqm,
                yield_rate,
                growth_rate,
                frequency,
            } => {
                non_negative("land_size", *land_size)?;
                non_negative("land_price_per_sqm", *land_price_per_sqm)?;
                non_negative("bua_size", *bua_size)?;
                non_negative("construction_cost_per_sqm", *construction_cost_per_sqm)?;
                non_negative("yield_rate", *yield_rate)?;
                growth_above_floor(*growth_rate)?;
                positive_frequency(*frequency)
            }
        }
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            RentParams::FixedEscalation { .. } => "fixed_escalation",
            RentParams::RevenueShare { .. } => "revenue_share",
            RentParams::PartnerInvestment { .. } => "partner_investment",
        }
    }

    /// Unrounded rent for `year`. Escalation counts whole years from the
    /// contract start.
    pub fn rent_for_year(
        &self,
        year: Year,
        contract: &ContractWindow,
        total_revenue: Money,
    ) -> ProjectionResult<Money> {
        let elapsed = contract.years_elapsed(year);
        match self {
            RentParams::FixedEscalation {
                base_rent,
                growth_rate,
                frequency,
            } => step_escalation(*base_rent, *growth_rate, elapsed, *frequency),
            RentParams::RevenueShare {
                revenue_share_percent,
            } => Ok(total_revenue * *revenue_share_percent),
            RentParams::PartnerInvestment {
                yield_rate,
                growth_rate,
                frequency,
                ..
            } => {
                let base = annuity_payment(
                    self.partner_capital(),
                    *yield_rate,
                    contract.term_years(),
                );
                step_escalation(base, *growth_rate, elapsed, *frequency)
            }
        }
    }

    /// Land plus construction capital for a partner-investment lease; zero
    /// for the other models.
    pub fn partner_capital(&self) -> Money {
        match self {
            RentParams::PartnerInvestment {
                land_size,
                land_price_per_sqm,
                bua_size,
                construction_cost_per_sqm,
                ..
            } => *land_size * *land_price_per_sqm + *bua_size * *construction_cost_per_sqm,
            _ => Decimal::ZERO,
        }
    }
}

fn non_negative(field: &str, value: Decimal) -> ProjectionResult<()> {
    if value < Decimal::ZERO {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidRentParams,
            format!("{field} must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn growth_above_floor(rate: Rate) -> ProjectionResult<()> {
    if rate <= -Decimal::ONE {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidRentParams,
            format!("growth_rate must be above -100%, got {rate}"),
        ));
    }
    Ok(())
}

fn positive_frequency(frequency: u32) -> ProjectionResult<()> {
    if frequency == 0 {
        return Err(ProjectionError::config(
            ConfigErrorCode::InvalidRentParams,
            "escalation frequency must be at least 1 year",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Preview schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentScheduleRow {
    pub year: Year,
    pub total_revenue: Money,
    pub rent: Money,
    pub rent_to_revenue: Rate,
}

/// Rent for every year in `revenues`, rounded through `ctx`.
pub fn rent_schedule(
    params: &RentParams,
    contract: &ContractWindow,
    revenues: &[(Year, Money)],
    ctx: &NumericContext,
) -> ProjectionResult<Vec<RentScheduleRow>> {
    params.validate()?;
    revenues
        .iter()
        .map(|&(year, total_revenue)| {
            let rent = ctx.round(params.rent_for_year(year, contract, total_revenue)?);
            Ok(RentScheduleRow {
                year,
                total_revenue,
                rent,
                rent_to_revenue: safe_divide(rent, total_revenue).round_dp(6),
            })
        })
        .collect()
}
