// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Edge authenticator middleware.
//!
//! Runs on every inbound request, ahead of all handlers. Resolves the
//! route's policy from the declarative table, verifies the bearer token for
//! protected routes, enforces role requirements, and attaches the
//! propagation envelope consumed by internal collaborators. Public routes
//! skip verification entirely.
//!
//! This is the sole trust boundary: nothing downstream re-verifies a
//! signature.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

use super::claims::VerifiedIdentity;
use super::error::AuthError;
use super::policy::RoutePolicy;

/// Envelope header carrying the verified subject id.
pub const SUBJECT_HEADER: &str = "x-tasklane-subject";

/// Envelope header carrying the comma-separated verified role list.
pub const ROLES_HEADER: &str = "x-tasklane-roles";

/// Edge authentication middleware.
pub async fn edge_authenticator(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Inbound envelope headers are never trusted across the edge; a client
    // cannot smuggle an identity past verification.
    request.headers_mut().remove(SUBJECT_HEADER);
    request.headers_mut().remove(ROLES_HEADER);

    let policy = state.policies.resolve(&path);
    if policy == RoutePolicy::Public {
        return next.run(request).await;
    }

    match authenticate(&state, request.headers(), policy) {
        Ok(identity) => {
            attach_envelope(&mut request, &identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Verify the bearer token and enforce the route's role requirement.
fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    policy: RoutePolicy,
) -> Result<VerifiedIdentity, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    let claims = state.codec.verify(token)?;
    let identity = VerifiedIdentity::from_claims(&claims);

    if let RoutePolicy::RequireRole(required) = policy {
        if !identity.has_role(required) {
            return Err(AuthError::InsufficientRole);
        }
    }

    Ok(identity)
}

/// Attach the propagation envelope: request extension for in-process
/// handlers plus headers for calls forwarded to other services.
fn attach_envelope(request: &mut Request, identity: &VerifiedIdentity) {
    request.extensions_mut().insert(identity.clone());

    if let Ok(value) = HeaderValue::from_str(&identity.subject_id) {
        request.headers_mut().insert(SUBJECT_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&identity.roles_header()) {
        request.headers_mut().insert(ROLES_HEADER, value);
    }
}
