use clap::Args;
use serde::Deserialize;
use serde_json::{json, Value};

use lease_projection_core::batch::{run_batch, run_batch_cached, BatchSummary, ProposalRun};
use lease_projection_core::cache::ProjectionCache;

use crate::input;

/// Arguments for projecting several proposals in parallel
#[derive(Args)]
pub struct BatchArgs {
    /// Path to a JSON or YAML file holding `{"proposals": [...]}`
    #[arg(long)]
    pub input: Option<String>,

    /// Share one result cache across the batch
    #[arg(long)]
    pub cached: bool,
}

#[derive(Deserialize)]
struct BatchInput {
    proposals: Vec<ProposalRun>,
}

pub fn run_batch_command(args: BatchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let batch: BatchInput = input::load(args.input.as_deref(), "batch")?;
    if batch.proposals.is_empty() {
        return Err("batch input holds no proposals".into());
    }

    let results = if args.cached {
        let cache = ProjectionCache::new();
        let results = run_batch_cached(&batch.proposals, &cache);
        log::info!("batch cache holds {} distinct projections", cache.len());
        results
    } else {
        run_batch(&batch.proposals)
    };

    let summaries: Vec<BatchSummary> = results.iter().map(|r| r.summary()).collect();
    let failed = summaries.iter().filter(|s| s.status != "OK").count();
    let warnings: Vec<String> = summaries
        .iter()
        .filter_map(|s| {
            s.message
                .as_ref()
                .map(|m| format!("{} failed: {}", s.proposal_id, m))
        })
        .collect();

    Ok(json!({
        "results": summaries,
        "proposals": summaries.len(),
        "failed": failed,
        "warnings": warnings,
    }))
}
