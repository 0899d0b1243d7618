// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Account roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account roles for authorization.
///
/// Role membership is checked only at the edge (route policy) and by
/// business services consuming the propagation envelope; it is never
/// inferred anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Normal platform member (default on registration)
    Member,
}

impl Role {
    /// Parse role from string (case-insensitive).
    /// Used when decoding the roles header of the propagation envelope.
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is Member (least privilege for authenticated users).
    fn default() -> Self {
        Role::Member
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Member => write!(f, "member"),
        }
    }
}
