//! Caller privilege context.
//!
//! Roles are granted once, when the run is created, and never change while
//! it executes. That is why authorization denials are terminal: retrying
//! cannot produce a different answer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A role name, e.g. "admin" or "readonly".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    /// Construct a role from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// The full set of roles held by the caller of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerContext {
    inner: HashSet<Role>,
}

impl CallerContext {
    /// Build a context from plain role names.
    pub fn from_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ctx = Self::default();
        for role in roles {
            ctx.grant(Role::new(role));
        }
        ctx
    }

    /// Grant a role to this caller.
    pub fn grant(&mut self, role: Role) {
        self.inner.insert(role);
    }

    /// Return true if the caller holds the given role.
    pub fn has(&self, role: &Role) -> bool {
        self.inner.contains(role)
    }

    /// Return true if the caller holds a role with this name.
    pub fn has_named(&self, name: &str) -> bool {
        self.inner.iter().any(|r| r.0 == name)
    }

    /// Return an iterator over all granted roles.
    pub fn all(&self) -> impl Iterator<Item = &Role> {
        self.inner.iter()
    }
}
