// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Internal trust acceptor: the `Identity` extractor.
//!
//! Business handlers take `Identity(identity)` and treat it as ground
//! truth. The extractor reads only the propagation envelope attached by the
//! edge authenticator — request extension in-process, envelope headers when
//! the call crossed a service boundary. It performs **no** signature
//! verification; that cost is paid once at the edge.
//!
//! A request lacking the envelope is unauthenticated, never an
//! anonymous-but-permitted identity.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::claims::VerifiedIdentity;
use super::error::AuthError;
use super::middleware::{ROLES_HEADER, SUBJECT_HEADER};

/// Extractor yielding the identity verified at the edge.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(Identity(identity): Identity) -> impl IntoResponse {
///     // identity.subject_id, identity.roles
/// }
/// ```
pub struct Identity(pub VerifiedIdentity);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // In-process: the edge middleware stored the identity as an extension
        if let Some(identity) = parts.extensions.get::<VerifiedIdentity>().cloned() {
            return Ok(Identity(identity));
        }

        // Cross-service: read the envelope headers set by the edge
        let subject_id = parts
            .headers
            .get(SUBJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingEnvelope)?
            .to_string();

        let roles = parts
            .headers
            .get(ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(VerifiedIdentity::roles_from_header)
            .unwrap_or_default();

        Ok(Identity(VerifiedIdentity { subject_id, roles }))
    }
}
