// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Token codec: stateless encode/sign and decode/verify of access tokens.
//!
//! HS256 with a process-wide secret injected at construction. The codec is
//! the only place the secret lives; the session issuer is the only caller
//! of `issue`, the edge authenticator the only caller of `verify`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::storage::StoredAccount;

use super::claims::AccessClaims;
use super::error::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Stateless signer/verifier for access tokens.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

impl TokenCodec {
    /// Create a codec from the signing secret and access token lifetime.
    ///
    /// The secret is an explicit configuration value, fixed at startup —
    /// never a mutable global.
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
        }
    }

    /// Issue a signed access token for an account.
    pub fn issue(&self, account: &StoredAccount) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            roles: account.roles.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// Pure and thread-safe: no storage lookup, no shared mutable state.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let token_data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        Ok(token_data.claims)
    }
}
