//! Independent proposals in parallel. Each projection stays single-threaded;
//! parallelism is across proposals only.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::input::ProjectionInput;
use crate::engine::projection::{run_projection, run_with_timeout, CalculationEngineOutput};
use crate::types::{Money, Rate};
use crate::ProjectionResult;

#[cfg(feature = "cache")]
use crate::cache::ProjectionCache;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRun {
    pub proposal_id: String,
    pub input: ProjectionInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug)]
pub struct BatchResult {
    pub proposal_id: String,
    pub result: ProjectionResult<Arc<CalculationEngineOutput>>,
}

/// Flat, serializable view of one batch entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub proposal_id: String,
    /// "OK" or the error code
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_annualized_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npv_rent: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_periods_balanced: Option<bool>,
}

impl BatchResult {
    pub fn summary(&self) -> BatchSummary {
        match &self.result {
            Ok(out) => BatchSummary {
                proposal_id: self.proposal_id.clone(),
                status: "OK".into(),
                message: None,
                net_annualized_value: Some(out.metrics.net_annualized_value),
                npv_rent: Some(out.metrics.npv_rent),
                irr: out.metrics.irr,
                all_periods_balanced: Some(out.validation.all_periods_balanced),
            },
            Err(e) => BatchSummary {
                proposal_id: self.proposal_id.clone(),
                status: e.code().into(),
                message: Some(e.to_string()),
                net_annualized_value: None,
                npv_rent: None,
                irr: None,
                all_periods_balanced: None,
            },
        }
    }
}

fn run_one(run: &ProposalRun) -> ProjectionResult<CalculationEngineOutput> {
    match run.timeout_ms {
        Some(ms) => run_with_timeout(&run.input, ms),
        None => run_projection(&run.input),
    }
}

/// Run every proposal; one failure never affects the others. Results keep
/// the input order.
pub fn run_batch(runs: &[ProposalRun]) -> Vec<BatchResult> {
    runs.par_iter()
        .map(|run| BatchResult {
            proposal_id: run.proposal_id.clone(),
            result: run_one(run).map(Arc::new),
        })
        .collect()
}

/// [`run_batch`] through a shared cache: proposals with identical inputs
/// are computed once.
#[cfg(feature = "cache")]
pub fn run_batch_cached(runs: &[ProposalRun], cache: &ProjectionCache) -> Vec<BatchResult> {
    runs.par_iter()
        .map(|run| BatchResult {
            proposal_id: run.proposal_id.clone(),
            result: cache.get_or_compute(&run.proposal_id, &run.input, |_| run_one(run)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::fixtures::sample_input;
    use pretty_assertions::assert_eq;

    fn runs() -> Vec<ProposalRun> {
        let mut bad = sample_input();
        bad.dynamic.enrollment.steady_state_students = 0;
        let mut bigger = sample_input();
        bigger.dynamic.enrollment.steady_state_students = 2400;
        vec![
            ProposalRun {
                proposal_id: "a".into(),
                input: sample_input(),
                timeout_ms: None,
            },
            ProposalRun {
                proposal_id: "bad".into(),
                input: bad,
                timeout_ms: None,
            },
            ProposalRun {
                proposal_id: "b".into(),
                input: bigger,
                timeout_ms: Some(60_000),
            },
        ]
    }

    #[test]
    fn test_batch_isolates_failures_and_keeps_order() {
        let results = run_batch(&runs());
        let ids: Vec<&str> = results.iter().map(|r| r.proposal_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "bad", "b"]);
        assert!(results[0].result.is_ok());
        assert_eq!(results[1].summary().status, "NON_POSITIVE_ENROLLMENT");
        assert!(results[2].result.is_ok());
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let results = run_batch(&runs());
        let sequential = run_projection(&sample_input()).unwrap();
        let parallel = results[0].result.as_ref().unwrap();
        assert_eq!(parallel.periods, sequential.periods);
        assert_eq!(parallel.metrics, sequential.metrics);
    }

    #[cfg(feature = "cache")]
    #[test]
    fn test_cached_batch_shares_identical_inputs() {
        let cache = ProjectionCache::new();
        let mut all = runs();
        all.push(ProposalRun {
            proposal_id: "a-copy".into(),
            input: sample_input(),
            timeout_ms: None,
        });
        let results = run_batch_cached(&all, &cache);
        // "a" and "a-copy" share one fingerprint; "bad" is not cached
        assert_eq!(cache.len(), 2);
        let a = results[0].result.as_ref().unwrap();
        let copy = results[3].result.as_ref().unwrap();
        assert!(Arc::ptr_eq(a, copy));
    }
}
