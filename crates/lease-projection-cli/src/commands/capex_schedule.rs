use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use lease_projection_core::capex::depreciation_schedule;
use lease_projection_core::periods::dynamic::revenue_path;
use lease_projection_core::working_capital::resolve_ratios;
use lease_projection_core::ProjectionInput;

use crate::input;

/// Arguments for previewing capex and depreciation
#[derive(Args)]
pub struct CapexScheduleArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_capex_schedule(args: CapexScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection: ProjectionInput = input::load(args.input.as_deref(), "capex-schedule")?;
    projection.capex.validate()?;
    let ratios = resolve_ratios(&projection.working_capital, &projection.historical)?;

    // Transition years carry no revenue-linked reinvestment
    let mut revenues: Vec<(i32, Decimal)> = projection
        .transition
        .iter()
        .map(|t| (t.year, Decimal::ZERO))
        .collect();
    revenues.extend(revenue_path(
        &projection.dynamic,
        &projection.contract,
        ratios.other_revenue_ratio,
        &projection.numeric,
    )?);

    let rows = depreciation_schedule(
        &projection.seeded_capex(),
        projection.contract,
        &revenues,
        &projection.numeric,
    )?;

    let total_capex: Decimal = rows.iter().map(|r| r.capex_total).sum();
    let total_depreciation: Decimal = rows.iter().map(|r| r.total_depreciation).sum();
    let ending_nbv = rows.last().map(|r| r.net_book_value).unwrap_or_default();
    let flat: Vec<Value> = rows
        .iter()
        .map(|r| {
            json!({
                "year": r.year,
                "capex": r.capex_total,
                "pre_contract_depreciation": r.pre_contract_depreciation,
                "contract_depreciation": r.contract_depreciation,
                "total_depreciation": r.total_depreciation,
                "net_book_value": r.net_book_value,
            })
        })
        .collect();

    Ok(json!({
        "result": {
            "years": rows.len(),
            "total_capex": total_capex,
            "total_depreciation": total_depreciation,
            "ending_net_book_value": ending_nbv,
        },
        "rows": flat,
    }))
}
