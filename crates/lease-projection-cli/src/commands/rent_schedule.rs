use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use lease_projection_core::periods::dynamic::revenue_path;
use lease_projection_core::rent::rent_schedule;
use lease_projection_core::working_capital::resolve_ratios;
use lease_projection_core::ProjectionInput;

use crate::input;

/// Arguments for previewing rent over the contract window
#[derive(Args)]
pub struct RentScheduleArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_rent_schedule(args: RentScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection: ProjectionInput = input::load(args.input.as_deref(), "rent-schedule")?;
    let ratios = resolve_ratios(&projection.working_capital, &projection.historical)?;
    let path = revenue_path(
        &projection.dynamic,
        &projection.contract,
        ratios.other_revenue_ratio,
        &projection.numeric,
    )?;
    let rows = rent_schedule(
        &projection.dynamic.rent,
        &projection.contract,
        &path,
        &projection.numeric,
    )?;

    let total_rent: Decimal = rows.iter().map(|r| r.rent).sum();
    let total_revenue: Decimal = rows.iter().map(|r| r.total_revenue).sum();
    Ok(json!({
        "result": {
            "model": projection.dynamic.rent.model_name(),
            "years": rows.len(),
            "total_rent": total_rent,
            "total_revenue": total_revenue,
            "partner_capital": projection.dynamic.rent.partner_capital(),
        },
        "rows": rows,
    }))
}
