//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. run_id as its hyphenated UUID string
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the step event

use sha2::{Digest, Sha256};

use querygate_contracts::{event::StepEvent, run::RunId};

use crate::entry::TraceEntry;

/// Compute the lowercase hex SHA-256 of one trace entry.
///
/// # Panics
///
/// Panics if `event` cannot be serialized to JSON, which cannot happen for
/// `StepEvent`: every field is a plain serde type with string map keys.
pub fn hash_entry(run_id: &RunId, sequence: u64, event: &StepEvent, prev_hash: &str) -> String {
    let event_json = serde_json::to_vec(event).expect("StepEvent must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(run_id.to_string().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);

    hex::encode(hasher.finalize())
}

/// True when every entry links to its predecessor and its stored hash
/// matches a recomputation. An empty chain is valid.
pub fn verify_chain(entries: &[TraceEntry]) -> bool {
    let mut expected_prev = TraceEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }
        let recomputed = hash_entry(&entry.run_id, entry.sequence, &entry.event, &entry.prev_hash);
        if entry.this_hash != recomputed {
            return false;
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}
