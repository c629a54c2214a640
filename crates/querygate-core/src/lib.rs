//! # querygate-core
//!
//! The bounded agent loop that turns a natural-language question into SQL
//! actions under policy control.
//!
//! This crate provides:
//! - The five port traits (`ReasoningPort`, `DatabasePort`, `PolicyGate`,
//!   `ResponseVerifier`, `EventSink`)
//! - One type per stage (`Planner`, `Decider`, `Reflector`, `Executor`,
//!   `Finalizer`)
//! - The `Orchestrator` that wires them together in the correct trust order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use querygate_core::{AgentConfig, Orchestrator, RunRequest};
//!
//! let orchestrator = Orchestrator::new(reasoning, database, policy, verifier, AgentConfig::default());
//! let summary = orchestrator.run(RunRequest::new("How many customers are there?")).await;
//! ```

pub mod config;
pub mod decider;
pub mod executor;
pub mod finalizer;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod reflector;
pub mod response;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AgentConfig;
pub use orchestrator::{Orchestrator, RunRequest};
