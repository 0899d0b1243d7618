// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! Refresh tokens travel in JSON bodies, never in cookies: every service
//! client of the auth API is programmatic.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::StoredAccount;

// =============================================================================
// Request Models
// =============================================================================

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Plaintext password, hashed server-side before storage.
    pub password: String,
    /// Display name shown in other Tasklane services.
    pub display_name: String,
}

/// Request to authenticate with credentials.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request to rotate a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// The opaque refresh token to consume.
    pub refresh_token: String,
}

/// Request to end a session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// The refresh token to revoke.
    pub refresh_token: String,
}

/// Request to enable or disable an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

// =============================================================================
// Response Models
// =============================================================================

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub active: bool,
    pub created_at: String,
}

impl From<StoredAccount> for AccountResponse {
    fn from(account: StoredAccount) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            roles: account.roles,
            active: account.active,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// A new session: the account plus its token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub account: AccountResponse,
    /// Short-lived signed access token (bearer).
    pub access_token: String,
    /// Opaque single-use refresh token.
    pub refresh_token: String,
}

/// Token pair returned by a successful refresh rotation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Result of an account active-flag change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetActiveResponse {
    pub account: AccountResponse,
    /// Refresh tokens revoked as part of disabling (0 when enabling).
    pub tokens_revoked: usize,
}

/// Result of an expired-token purge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurgeResponse {
    /// Number of expired refresh tokens deleted.
    pub purged: usize,
}
