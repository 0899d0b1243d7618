// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Session issuer.
//!
//! Orchestrates the credential check, the token codec, and the refresh
//! token store. The issuer is the only writer to the refresh token store
//! and the only caller of the codec's signing operation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::{password, Role, TokenCodec};
use crate::storage::{
    AccountRepository, AuthDatabase, NewAccount, RefreshTokenStore, RotationOutcome,
    StorageError, StoredAccount,
};

use super::error::SessionError;

/// A freshly issued session: account plus token pair.
#[derive(Debug)]
pub struct IssuedSession {
    pub account: StoredAccount,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token pair produced by a successful rotation.
#[derive(Debug)]
pub struct RotatedPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Orchestrator for register / login / refresh / logout / whoami.
pub struct SessionService {
    db: Arc<AuthDatabase>,
    codec: Arc<TokenCodec>,
    refresh_ttl: Duration,
}

impl SessionService {
    pub fn new(db: Arc<AuthDatabase>, codec: Arc<TokenCodec>, refresh_ttl: Duration) -> Self {
        Self {
            db,
            codec,
            refresh_ttl,
        }
    }

    /// Mint a fresh opaque refresh token value (128 bits of v4 entropy,
    /// twice over; never interpreted, only compared).
    fn mint_refresh_value() -> String {
        format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        )
    }

    /// Issue a token pair for an account, persisting the refresh token.
    fn issue_pair(&self, account: &StoredAccount) -> Result<(String, String), SessionError> {
        let access_token = self.codec.issue(account)?;
        let refresh_value = Self::mint_refresh_value();
        RefreshTokenStore::new(&self.db).create(
            &account.id,
            &refresh_value,
            Utc::now() + self.refresh_ttl,
        )?;
        Ok((access_token, refresh_value))
    }

    /// Create an account with the default Member role and issue its first
    /// session.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IssuedSession, SessionError> {
        password::validate_email(email).map_err(SessionError::Validation)?;
        password::validate_password_strength(password).map_err(SessionError::Validation)?;

        let password_hash = password::hash_password(password).map_err(SessionError::Internal)?;

        let account = AccountRepository::new(&self.db)
            .create(NewAccount {
                email: email.to_string(),
                password_hash,
                display_name: display_name.trim().to_string(),
                roles: vec![Role::Member],
            })
            .map_err(|e| match e {
                StorageError::EmailTaken(_) => SessionError::EmailAlreadyExists,
                other => SessionError::Storage(other),
            })?;

        info!(account_id = %account.id, "account registered");

        let (access_token, refresh_token) = self.issue_pair(&account)?;
        Ok(IssuedSession {
            account,
            access_token,
            refresh_token,
        })
    }

    /// Verify credentials and issue a session.
    ///
    /// Unknown email and wrong password produce the same error. The
    /// disabled check runs only after the password succeeded, so a caller
    /// who cannot authenticate learns nothing about the account.
    pub fn login(&self, email: &str, password: &str) -> Result<IssuedSession, SessionError> {
        let account = AccountRepository::new(&self.db)
            .find_by_email(email)?
            .ok_or(SessionError::InvalidCredentials)?;

        if !password::verify_password(password, &account.password_hash) {
            return Err(SessionError::InvalidCredentials);
        }

        if !account.active {
            return Err(SessionError::AccountDisabled);
        }

        info!(account_id = %account.id, "login succeeded");

        let (access_token, refresh_token) = self.issue_pair(&account)?;
        Ok(IssuedSession {
            account,
            access_token,
            refresh_token,
        })
    }

    /// Rotate a refresh token and issue a new access token.
    ///
    /// Exactly-once per token value: the store consumes and replaces the
    /// token in one ACID transaction, so the loser of a race observes
    /// `InvalidRefreshToken`.
    pub fn refresh(&self, refresh_token: &str) -> Result<RotatedPair, SessionError> {
        let successor_value = Self::mint_refresh_value();
        let outcome = RefreshTokenStore::new(&self.db).consume_and_rotate(
            refresh_token,
            &successor_value,
            Utc::now() + self.refresh_ttl,
        )?;

        let consumed = match outcome {
            RotationOutcome::Rotated { consumed, .. } => consumed,
            RotationOutcome::NotUsable => return Err(SessionError::InvalidRefreshToken),
            RotationOutcome::OwnerDisabled => return Err(SessionError::AccountDisabled),
        };

        let account = AccountRepository::new(&self.db)
            .get(&consumed.owner_id)?
            .ok_or(SessionError::AccountNotFound)?;

        let access_token = self.codec.issue(&account)?;
        info!(account_id = %account.id, "refresh token rotated");

        Ok(RotatedPair {
            access_token,
            refresh_token: successor_value,
        })
    }

    /// Revoke a refresh token. Idempotent: revoking an already-revoked or
    /// unknown token is not an error.
    pub fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        let revoked = RefreshTokenStore::new(&self.db).revoke_by_token(refresh_token)?;
        if revoked {
            info!("refresh token revoked on logout");
        }
        Ok(())
    }

    /// Look up the account behind a verified subject id.
    pub fn whoami(&self, account_id: &str) -> Result<StoredAccount, SessionError> {
        AccountRepository::new(&self.db)
            .get(account_id)?
            .ok_or(SessionError::AccountNotFound)
    }

    /// Enable or disable an account. Disabling revokes every outstanding
    /// refresh token atomically (session-wide logout).
    pub fn set_active(
        &self,
        account_id: &str,
        active: bool,
    ) -> Result<(StoredAccount, usize), SessionError> {
        let (account, revoked) = AccountRepository::new(&self.db)
            .set_active(account_id, active)?
            .ok_or(SessionError::AccountNotFound)?;

        info!(
            account_id = %account.id,
            active,
            tokens_revoked = revoked,
            "account active flag updated"
        );
        Ok((account, revoked))
    }

    /// Delete refresh tokens past expiry. Returns the number removed.
    pub fn purge_expired_tokens(&self) -> Result<usize, SessionError> {
        Ok(RefreshTokenStore::new(&self.db).delete_expired()?)
    }
}
