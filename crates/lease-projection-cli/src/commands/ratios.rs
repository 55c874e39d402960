use clap::Args;
use serde_json::{json, Value};

use lease_projection_core::working_capital::resolve_ratios;
use lease_projection_core::ProjectionInput;

use crate::input;

/// Arguments for resolving working-capital ratios
#[derive(Args)]
pub struct RatiosArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_ratios(args: RatiosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection: ProjectionInput = input::load(args.input.as_deref(), "ratios")?;
    let ratios = resolve_ratios(&projection.working_capital, &projection.historical)?;
    let base_year = projection.historical.last().map(|h| h.year);
    Ok(json!({
        "result": serde_json::to_value(&ratios)?,
        "base_year": base_year,
    }))
}
