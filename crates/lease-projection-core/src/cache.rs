//! Fingerprint-keyed result cache.
//!
//! Identical input snapshots share one result. Each fingerprint owns a
//! `OnceCell`, so concurrent requests for the same fingerprint run the
//! computation once and the rest wait for it. A failed computation is not
//! stored; its slot is dropped and the next caller retries.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::input::ProjectionInput;
use crate::engine::projection::CalculationEngineOutput;
use crate::ProjectionResult;

/// Lowercase hex SHA-256 of the canonical JSON form of an input snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(input: &ProjectionInput) -> ProjectionResult<Self> {
        let bytes = serde_json::to_vec(input)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Fingerprint(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Slot = Arc<OnceCell<Arc<CalculationEngineOutput>>>;

#[derive(Default)]
struct Inner {
    slots: HashMap<Fingerprint, Slot>,
    /// Fingerprints computed on behalf of each proposal
    owners: HashMap<String, HashSet<Fingerprint>>,
}

#[derive(Default)]
pub struct ProjectionCache {
    inner: Mutex<Inner>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked writer leaves only whole map entries behind
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CalculationEngineOutput>> {
        self.lock()
            .slots
            .get(fingerprint)
            .and_then(|slot| slot.get().cloned())
    }

    /// Store a finished result for `proposal_id`. An existing result for the
    /// same fingerprint is kept.
    pub fn set(
        &self,
        proposal_id: &str,
        fingerprint: Fingerprint,
        output: CalculationEngineOutput,
    ) -> Arc<CalculationEngineOutput> {
        self.slot_for(proposal_id, &fingerprint)
            .get_or_init(|| Arc::new(output))
            .clone()
    }

    /// Drop every cached result computed for `proposal_id`. Returns the
    /// number of fingerprints evicted.
    pub fn invalidate(&self, proposal_id: &str) -> usize {
        let mut inner = self.lock();
        let Some(fingerprints) = inner.owners.remove(proposal_id) else {
            return 0;
        };
        let still_owned: HashSet<Fingerprint> =
            inner.owners.values().flatten().cloned().collect();
        let mut evicted = 0;
        for fp in fingerprints {
            if !still_owned.contains(&fp) && inner.slots.remove(&fp).is_some() {
                evicted += 1;
            }
        }
        log::debug!("invalidated {evicted} cached results for proposal {proposal_id}");
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached result for `input`, computing it with `compute` at
    /// most once across concurrent callers.
    pub fn get_or_compute<F>(
        &self,
        proposal_id: &str,
        input: &ProjectionInput,
        compute: F,
    ) -> ProjectionResult<Arc<CalculationEngineOutput>>
    where
        F: FnOnce(&ProjectionInput) -> ProjectionResult<CalculationEngineOutput>,
    {
        let fingerprint = Fingerprint::of(input)?;
        let slot = self.slot_for(proposal_id, &fingerprint);
        // The map lock is released here; only this fingerprint's cell blocks.
        let result = slot
            .get_or_try_init(|| {
                log::debug!("cache miss for {fingerprint} (proposal {proposal_id})");
                compute(input).map(Arc::new)
            })
            .cloned();
        if result.is_err() {
            self.discard_empty(proposal_id, &fingerprint, &slot);
        }
        result
    }

    fn slot_for(&self, proposal_id: &str, fingerprint: &Fingerprint) -> Slot {
        let mut inner = self.lock();
        inner
            .owners
            .entry(proposal_id.to_string())
            .or_default()
            .insert(fingerprint.clone());
        inner
            .slots
            .entry(fingerprint.clone())
            .or_default()
            .clone()
    }

    /// Forget a slot whose computation failed, unless a later caller filled
    /// or replaced it meanwhile.
    fn discard_empty(&self, proposal_id: &str, fingerprint: &Fingerprint, slot: &Slot) {
        let mut inner = self.lock();
        let unfilled = inner
            .slots
            .get(fingerprint)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if !unfilled {
            return;
        }
        inner.slots.remove(fingerprint);
        for owned in inner.owners.values_mut() {
            owned.remove(fingerprint);
        }
        inner.owners.retain(|_, owned| !owned.is_empty());
        log::trace!("dropped failed slot {fingerprint} (proposal {proposal_id})");
    }
}
