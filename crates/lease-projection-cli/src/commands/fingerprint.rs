use clap::Args;
use serde_json::{json, Value};

use lease_projection_core::cache::Fingerprint;
use lease_projection_core::ProjectionInput;

use crate::input;

/// Arguments for printing an input's cache fingerprint
#[derive(Args)]
pub struct FingerprintArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_fingerprint(args: FingerprintArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection: ProjectionInput = input::load(args.input.as_deref(), "fingerprint")?;
    let fp = Fingerprint::of(&projection)?;
    Ok(json!({
        "result": { "fingerprint": fp.to_string() },
    }))
}
