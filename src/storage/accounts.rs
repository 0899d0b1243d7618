// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Account repository.
//!
//! Accounts are keyed by UUID with a secondary index on normalized email.
//! The email index is maintained inside the same write transaction as the
//! account row, so uniqueness holds under concurrent registration.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;

use super::db::{AuthDatabase, StorageResult, ACCOUNTS, ACCOUNT_EMAIL_INDEX};
use super::refresh::revoke_all_in_write_txn;
use super::StorageError;

/// Account persisted in the auth database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredAccount {
    /// Unique account identifier (UUID)
    pub id: String,
    /// Normalized (lowercase) email, unique across accounts
    pub email: String,
    /// Argon2id password hash in PHC string format
    pub password_hash: String,
    /// Display name shown in the UI
    pub display_name: String,
    /// Role memberships, authoritative for authorization at the edge
    pub roles: Vec<Role>,
    /// Whether the account may authenticate
    pub active: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl StoredAccount {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Input for account creation. The password is hashed before it gets here.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub roles: Vec<Role>,
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AccountRepository<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Create a new account.
    ///
    /// Fails with `StorageError::EmailTaken` if the normalized email is
    /// already indexed. The uniqueness check and both inserts happen in one
    /// write transaction.
    pub fn create(&self, new: NewAccount) -> StorageResult<StoredAccount> {
        let email = new.email.trim().to_lowercase();
        let now = Utc::now();
        let account = StoredAccount {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: new.password_hash,
            display_name: new.display_name,
            roles: new.roles,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_vec(&account)?;

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut email_index = write_txn.open_table(ACCOUNT_EMAIL_INDEX)?;
            if email_index.get(email.as_str())?.is_some() {
                return Err(StorageError::EmailTaken(email));
            }
            email_index.insert(email.as_str(), account.id.as_str())?;

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            accounts.insert(account.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(account)
    }

    /// Look up an account by id.
    pub fn get(&self, account_id: &str) -> StorageResult<Option<StoredAccount>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(account_id)? {
            Some(value) => {
                let account: StoredAccount = serde_json::from_slice(value.value())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Look up an account by email (normalized before lookup).
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredAccount>> {
        let email = email.trim().to_lowercase();
        let read_txn = self.db.raw().begin_read()?;
        let email_index = read_txn.open_table(ACCOUNT_EMAIL_INDEX)?;

        let account_id = match email_index.get(email.as_str())? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };

        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(account_id.as_str())? {
            Some(value) => {
                let account: StoredAccount = serde_json::from_slice(value.value())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Enable or disable an account.
    ///
    /// Disabling revokes every refresh token the account owns, in the same
    /// write transaction, so no session survives the flip. Returns the
    /// updated account and the number of tokens revoked, or `None` if the
    /// account does not exist.
    pub fn set_active(
        &self,
        account_id: &str,
        active: bool,
    ) -> StorageResult<Option<(StoredAccount, usize)>> {
        let write_txn = self.db.raw().begin_write()?;
        let result = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;

            let lookup = accounts.get(account_id)?.map(|v| v.value().to_vec());
            let existing_bytes = match lookup {
                Some(v) => v,
                None => {
                    drop(accounts);
                    write_txn.commit()?;
                    return Ok(None);
                }
            };

            let mut account: StoredAccount = serde_json::from_slice(&existing_bytes)?;
            account.active = active;
            account.updated_at = Utc::now();

            let json = serde_json::to_vec(&account)?;
            accounts.insert(account_id, json.as_slice())?;
            drop(accounts);

            let revoked = if active {
                0
            } else {
                revoke_all_in_write_txn(&write_txn, account_id)?
            };

            (account, revoked)
        };
        write_txn.commit()?;
        Ok(Some(result))
    }
}
