// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Declarative per-route access policy.
//!
//! Route policy is a static table consulted by the edge authenticator
//! before any other handling — no per-handler annotations, no reflection.
//! Each rule is a path prefix; the longest matching prefix wins, and a
//! request matching no rule is Protected by default (fail closed).

use super::roles::Role;

/// Access policy for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// No verification; register/login/refresh and infrastructure routes
    Public,
    /// Valid access token required
    Authenticated,
    /// Valid access token plus the given role required
    RequireRole(Role),
}

/// Static route → policy table.
pub struct PolicyTable {
    rules: Vec<(&'static str, RoutePolicy)>,
}

impl PolicyTable {
    /// Build a table from `(prefix, policy)` rules.
    pub fn new(rules: Vec<(&'static str, RoutePolicy)>) -> Self {
        Self { rules }
    }

    /// The Tasklane route table.
    pub fn tasklane() -> Self {
        Self::new(vec![
            ("/v1/auth/register", RoutePolicy::Public),
            ("/v1/auth/login", RoutePolicy::Public),
            ("/v1/auth/refresh", RoutePolicy::Public),
            ("/v1/auth", RoutePolicy::Authenticated),
            ("/v1/admin", RoutePolicy::RequireRole(Role::Admin)),
            ("/v1/health", RoutePolicy::Public),
            ("/docs", RoutePolicy::Public),
            ("/api-doc", RoutePolicy::Public),
        ])
    }

    /// Resolve the policy for a request path. Longest matching prefix wins;
    /// unmatched paths are Authenticated.
    pub fn resolve(&self, path: &str) -> RoutePolicy {
        self.rules
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, policy)| *policy)
            .unwrap_or(RoutePolicy::Authenticated)
    }
}
