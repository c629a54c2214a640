//! # querygate-policy
//!
//! The deterministic gate between a step's critique and its execution.
//!
//! ## Overview
//!
//! This crate provides [`ThresholdPolicyGate`], which implements the
//! [`PolicyGate`](querygate_core::traits::PolicyGate) trait. It never calls
//! the reasoning port and never touches the database: a decision is a pure
//! function of the step, its assessment, the caller's roles and the loaded
//! [`PolicyConfig`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use querygate_policy::ThresholdPolicyGate;
//!
//! let gate = ThresholdPolicyGate::from_file(Path::new("policies/default.toml"))?;
//! // Pass `Box::new(gate)` to `querygate_core::Orchestrator::new(...)`.
//! ```

pub mod engine;
pub mod keywords;
pub mod rule;

pub use engine::ThresholdPolicyGate;
pub use rule::PolicyConfig;

// ── Tests ─────────────────────────────────────────────────────────────────────
