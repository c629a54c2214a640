//! # querygate-audit
//!
//! Append-only, SHA-256 hash-chained trace of step events.
//!
//! ## Overview
//!
//! Every `StepEvent` the orchestrator emits is wrapped in a `TraceEntry`
//! that links to the previous entry of the same run via its SHA-256 hash.
//! Editing any recorded event breaks the chain, and `verify_chain` detects
//! it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use querygate_audit::InMemoryTraceWriter;
//!
//! let trace = InMemoryTraceWriter::new();
//! let orchestrator = orchestrator.with_events(Arc::new(trace.clone()));
//! let state = orchestrator.execute(request).await;
//!
//! assert!(trace.verify_integrity(&state.run_id)?);
//! let exported = trace.export_trace(&state.run_id)?;
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use entry::{RunTrace, TraceEntry};
pub use memory::InMemoryTraceWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
