use clap::Args;
use serde_json::{json, Value};

use lease_projection_core::{
    run_projection, run_with_timeout, CalculationEngineOutput, ProjectionInput,
};

use crate::input;

/// Arguments for a full multi-period projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Abort the run after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Include the full statements for every period
    #[arg(long)]
    pub full: bool,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection: ProjectionInput = input::load(args.input.as_deref(), "project")?;
    let output = match args.timeout_ms {
        Some(ms) => run_with_timeout(&projection, ms)?,
        None => run_projection(&projection)?,
    };
    log::info!(
        "projected {} periods in {} us",
        output.performance.periods,
        output.performance.duration_us
    );
    envelope(&output, args.full)
}

/// Metrics as the headline result, one summary row per period.
pub fn envelope(
    output: &CalculationEngineOutput,
    full: bool,
) -> Result<Value, Box<dyn std::error::Error>> {
    let rows: Vec<Value> = output
        .periods
        .iter()
        .map(|p| {
            json!({
                "year": p.year,
                "kind": p.kind,
                "total_revenue": p.profit_and_loss.total_revenue,
                "rent": p.profit_and_loss.rent_expense,
                "ebitda": p.profit_and_loss.ebitda,
                "net_income": p.profit_and_loss.net_income,
                "cash": p.balance_sheet.cash,
                "debt": p.balance_sheet.debt,
            })
        })
        .collect();

    let mut value = json!({
        "result": serde_json::to_value(&output.metrics)?,
        "rows": rows,
        "validation": {
            "all_periods_balanced": output.validation.all_periods_balanced,
            "all_cash_flows_reconciled": output.validation.all_cash_flows_reconciled,
        },
        "performance": serde_json::to_value(&output.performance)?,
        "warnings": output.warnings,
        "calculated_at": output.calculated_at,
    });
    if full {
        if let Value::Object(map) = &mut value {
            map.insert("periods".into(), serde_json::to_value(&output.periods)?);
            map.insert("capex_schedule".into(), serde_json::to_value(&output.capex_schedule)?);
            map.insert(
                "working_capital_ratios".into(),
                serde_json::to_value(&output.working_capital_ratios)?,
            );
            map.insert("checks".into(), serde_json::to_value(&output.validation.checks)?);
        }
    }
    Ok(value)
}
