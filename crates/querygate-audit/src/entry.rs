//! Trace entry and sealed trace types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use querygate_contracts::{event::StepEvent, run::RunId};

/// One link in a run's hash chain.
///
/// Changing any field, including anything inside `event`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Position in the run's chain, starting at 0.
    pub sequence: u64,
    pub run_id: RunId,
    pub event: StepEvent,
    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,
    pub this_hash: String,
}

impl TraceEntry {
    /// The `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// The exported trace of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub run_id: RunId,
    pub entries: Vec<TraceEntry>,
    /// When `EventSink::finalize` was called for the run, if it has been.
    pub sealed_at: Option<DateTime<Utc>>,
    /// `this_hash` of the last entry; empty for an empty trace.
    pub terminal_hash: String,
}
