//! In-memory `EventSink` keeping one hash chain per run.
//!
//! A single writer can be attached to an orchestrator that serves many
//! concurrent runs; each run gets its own chain, keyed by `RunId`. Once a
//! run is finalized its chain is sealed and further events are refused.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use querygate_contracts::{
    error::{QueryGateError, QueryGateResult},
    event::StepEvent,
    run::RunId,
};
use querygate_core::traits::EventSink;

use crate::{
    chain::{hash_entry, verify_chain},
    entry::{RunTrace, TraceEntry},
};

struct Chain {
    entries: Vec<TraceEntry>,
    last_hash: String,
    sealed_at: Option<DateTime<Utc>>,
}

impl Chain {
    fn new() -> Self {
        Self { entries: Vec::new(), last_hash: TraceEntry::GENESIS_HASH.to_string(), sealed_at: None }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTraceWriter {
    chains: Arc<Mutex<HashMap<RunId, Chain>>>,
}

impl InMemoryTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> QueryGateResult<MutexGuard<'_, HashMap<RunId, Chain>>> {
        self.chains.lock().map_err(|e| QueryGateError::TraceWrite {
            reason: format!("trace state lock poisoned: {}", e),
        })
    }

    /// The trace recorded for `run_id`, or `None` if nothing was recorded.
    pub fn export_trace(&self, run_id: &RunId) -> QueryGateResult<Option<RunTrace>> {
        let chains = self.lock()?;
        Ok(chains.get(run_id).map(|chain| RunTrace {
            run_id: *run_id,
            entries: chain.entries.clone(),
            sealed_at: chain.sealed_at,
            terminal_hash: chain.entries.last().map(|e| e.this_hash.clone()).unwrap_or_default(),
        }))
    }

    /// Check the chain of `run_id`. A run with no entries is intact.
    pub fn verify_integrity(&self, run_id: &RunId) -> QueryGateResult<bool> {
        let chains = self.lock()?;
        Ok(chains.get(run_id).map_or(true, |chain| verify_chain(&chain.entries)))
    }

    /// All runs with a chain, in no particular order.
    pub fn run_ids(&self) -> QueryGateResult<Vec<RunId>> {
        Ok(self.lock()?.keys().copied().collect())
    }
}

impl EventSink for InMemoryTraceWriter {
    fn record(&self, event: &StepEvent) -> QueryGateResult<()> {
        let mut chains = self.lock()?;
        let chain = chains.entry(event.run_id).or_insert_with(Chain::new);

        if chain.sealed_at.is_some() {
            return Err(QueryGateError::TraceWrite {
                reason: format!("trace for run {} is sealed", event.run_id),
            });
        }

        let sequence = chain.entries.len() as u64;
        let prev_hash = chain.last_hash.clone();
        let this_hash = hash_entry(&event.run_id, sequence, event, &prev_hash);

        debug!(run_id = %event.run_id, sequence, kind = ?event.kind, "trace entry appended");

        chain.entries.push(TraceEntry {
            sequence,
            run_id: event.run_id,
            event: event.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        chain.last_hash = this_hash;
        Ok(())
    }

    fn finalize(&self, run_id: &RunId) -> QueryGateResult<()> {
        let mut chains = self.lock()?;
        let chain = chains.entry(*run_id).or_insert_with(Chain::new);
        if chain.sealed_at.is_none() {
            chain.sealed_at = Some(Utc::now());
        }

        info!(
            run_id = %run_id,
            entry_count = chain.entries.len(),
            terminal_hash = %chain.last_hash,
            "trace sealed"
        );
        Ok(())
    }
}
