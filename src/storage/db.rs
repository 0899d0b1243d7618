// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Embedded auth database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized StoredAccount
//! - `account_email_index`: normalized email → account_id
//! - `refresh_tokens`: opaque token string → serialized StoredRefreshToken
//! - `refresh_id_index`: token id → opaque token string
//! - `refresh_owner_index`: composite key (owner_id|token) → opaque token string
//!
//! Refresh tokens are keyed by their opaque value because `find_valid` and
//! `consume_and_rotate` are the hot paths. Write transactions are serialized
//! by redb, which is what makes rotation exactly-once per token value.

use std::path::Path;

use redb::{Database, TableDefinition};

/// Primary table: account_id → serialized StoredAccount (JSON bytes).
pub(crate) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Index: normalized (lowercase) email → account_id.
pub(crate) const ACCOUNT_EMAIL_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("account_email_index");

/// Primary table: opaque token string → serialized StoredRefreshToken (JSON bytes).
pub(crate) const REFRESH_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("refresh_tokens");

/// Index: token id (UUID) → opaque token string.
pub(crate) const REFRESH_ID_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("refresh_id_index");

/// Index: composite key `owner_id|token` → opaque token string.
/// Enables a prefix range scan over all tokens of one account.
pub(crate) const REFRESH_OWNER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("refresh_owner_index");

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Embedded ACID database holding accounts and refresh tokens.
pub struct AuthDatabase {
    db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_EMAIL_INDEX)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
            let _ = write_txn.open_table(REFRESH_ID_INDEX)?;
            let _ = write_txn.open_table(REFRESH_OWNER_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn raw(&self) -> &Database {
        &self.db
    }
}

/// Build a composite key for the refresh_owner_index table.
///
/// Format: `owner_id | token`
pub(crate) fn owner_index_key(owner_id: &str, token: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner_id.len() + 1 + token.len());
    key.extend_from_slice(owner_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(token.as_bytes());
    key
}

/// Build a prefix key for range scanning all tokens of one owner.
pub(crate) fn owner_prefix(owner_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner_id.len() + 1);
    prefix.extend_from_slice(owner_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with 0xFF bytes appended).
pub(crate) fn owner_prefix_end(owner_id: &str) -> Vec<u8> {
    let mut end = owner_prefix(owner_id);
    // Past any valid token key with this prefix (tokens are ASCII)
    end.extend_from_slice(&[0xFF; 8]);
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("auth.redb")).unwrap();

        // A fresh read transaction must find every table
        use redb::ReadableDatabase;
        let read_txn = db.raw().begin_read().unwrap();
        assert!(read_txn.open_table(ACCOUNTS).is_ok());
        assert!(read_txn.open_table(REFRESH_TOKENS).is_ok());
        assert!(read_txn.open_table(REFRESH_OWNER_INDEX).is_ok());
    }

    #[test]
    fn owner_index_key_prefix_bounds() {
        let key = owner_index_key("acct-1", "tok");
        let start = owner_prefix("acct-1");
        let end = owner_prefix_end("acct-1");
        assert!(key.as_slice() >= start.as_slice());
        assert!(key.as_slice() < end.as_slice());

        // Keys of a different owner fall outside the range
        let other = owner_index_key("acct-2", "tok");
        assert!(other.as_slice() >= end.as_slice() || other.as_slice() < start.as_slice());
    }
}
