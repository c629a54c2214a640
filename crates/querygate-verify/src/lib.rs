//! # querygate-verify
//!
//! Verification of structured reasoning replies.
//!
//! This crate provides [`SchemaVerifier`], which implements the
//! [`querygate_core::traits::ResponseVerifier`] trait. Replies are checked
//! in two phases:
//!
//! 1. **Structural**: JSON Schema validation via the `jsonschema` crate.
//! 2. **Semantic**: `RequiredField`, `AllowedValues` and `NumericRange`
//!    rules evaluated against the reply.
//!
//! The built-in per-stage schemas live in
//! `querygate_contracts::verify::ResponseSchema::for_stage`.

pub mod engine;

pub use engine::SchemaVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────
