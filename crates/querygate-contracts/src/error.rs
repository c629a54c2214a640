//! Runtime error types for the QueryGate agent loop.
//!
//! Most failures inside a run are NOT errors: failed SQL, confidence denials
//! and authorization denials are ordinary control flow recorded on the run
//! state. `QueryGateError` is reserved for faults at a port boundary (which
//! the stages convert into fallbacks) and for broken bookkeeping, which is
//! the only thing that aborts a run.

use thiserror::Error;

/// The unified error type for the QueryGate workspace.
#[derive(Debug, Error)]
pub enum QueryGateError {
    /// The reasoning port failed to produce a completion (transport, auth, timeout).
    #[error("reasoning call failed: {reason}")]
    Reasoning { reason: String },

    /// The reasoning port answered, but the answer is not the expected JSON shape.
    #[error("malformed reasoning response: {reason}")]
    MalformedResponse { reason: String },

    /// The database port could not run a statement or read the schema.
    #[error("database error: {reason}")]
    Database { reason: String },

    /// An illegal step or run transition was attempted.
    ///
    /// Raised by `Step::advance` and `RunState::apply`; it means the
    /// orchestrator's own bookkeeping is wrong and the run must abort.
    #[error("state machine error: {reason}")]
    StateMachine { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A response schema document could not be compiled or applied.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// The trace sink could not persist a step event.
    #[error("trace write failed: {reason}")]
    TraceWrite { reason: String },
}

/// Convenience alias used throughout the QueryGate crates.
pub type QueryGateResult<T> = Result<T, QueryGateError>;
