// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Access token claims and the verified identity they produce.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by a Tasklane access token.
///
/// The token is self-contained: signature plus expiry check is the entire
/// verification, no storage lookup. Issued only by the session issuer,
/// verified only by the edge authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject — the canonical account id
    pub sub: String,

    /// Account email at issuance time
    pub email: String,

    /// Role memberships at issuance time
    pub roles: Vec<Role>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Identity established at the edge and propagated to internal collaborators.
///
/// This is the payload of the propagation envelope. Downstream handlers
/// treat it as ground truth and never re-verify a signature — the edge
/// authenticator is the sole trust boundary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifiedIdentity {
    /// Canonical account id (`sub` claim)
    pub subject_id: String,

    /// Role memberships from the verified claims
    pub roles: Vec<Role>,
}

impl VerifiedIdentity {
    /// Build from verified claims.
    pub fn from_claims(claims: &AccessClaims) -> Self {
        Self {
            subject_id: claims.sub.clone(),
            roles: claims.roles.clone(),
        }
    }

    /// Check role membership.
    pub fn has_role(&self, required: Role) -> bool {
        self.roles.contains(&required)
    }

    /// Comma-separated role list for the envelope header.
    pub fn roles_header(&self) -> String {
        self.roles
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the roles header back into a role list. Unknown names are
    /// dropped rather than failing the request.
    pub fn roles_from_header(value: &str) -> Vec<Role> {
        value.split(',').filter_map(Role::from_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> AccessClaims {
        AccessClaims {
            sub: "acct-123".to_string(),
            email: "alice@example.com".to_string(),
            roles: vec![Role::Member, Role::Admin],
            iat: 1_700_000_000,
            exp: 1_700_000_900,
        }
    }

    #[test]
    fn from_claims_extracts_subject_and_roles() {
        let identity = VerifiedIdentity::from_claims(&sample_claims());
        assert_eq!(identity.subject_id, "acct-123");
        assert!(identity.has_role(Role::Admin));
        assert!(identity.has_role(Role::Member));
    }

    #[test]
    fn roles_header_round_trips() {
        let identity = VerifiedIdentity::from_claims(&sample_claims());
        let header = identity.roles_header();
        assert_eq!(header, "member,admin");
        assert_eq!(
            VerifiedIdentity::roles_from_header(&header),
            vec![Role::Member, Role::Admin]
        );
    }

    #[test]
    fn unknown_role_names_are_dropped() {
        assert_eq!(
            VerifiedIdentity::roles_from_header("member,superuser"),
            vec![Role::Member]
        );
    }
}
