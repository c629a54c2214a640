//! # querygate-ref-sqlite
//!
//! SQLite reference runtime for QueryGate.
//!
//! Provides a `DatabasePort` over rusqlite, an HTTP `ReasoningPort` for
//! OpenAI-compatible endpoints, and four deterministic scenarios that run
//! the real gate, verifier and trace writer against a seeded shop database:
//!
//! 1. **List Tables**: introspection passes without critique.
//! 2. **Blocked Delete**: a destructive statement from a read-only caller
//!    halts the run.
//! 3. **Replan After Critique**: a low-confidence query is sent back and
//!    corrected.
//! 4. **Step Budget**: a failed step is recovered from, then the budget
//!    closes the run as partial.
//!
//! All sample data is fictional. The scenarios make no network calls.

pub mod database;
pub mod mock_data;
pub mod reasoning;
pub mod scenarios;

pub use database::SqliteDatabase;
pub use reasoning::{HttpReasoningClient, ReasoningConfig, ScriptedReasoning};

/// The policy shipped in `policies/default.toml`.
pub const DEFAULT_POLICY: &str = include_str!("../../../policies/default.toml");

// ── Tests ─────────────────────────────────────────────────────────────────────
