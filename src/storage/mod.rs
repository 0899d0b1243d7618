// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! # Auth Storage Module
//!
//! Persistent storage for accounts and refresh tokens, backed by a single
//! redb database file (pure Rust, ACID).
//!
//! ## Why redb here
//!
//! Refresh-token rotation must be exactly-once per token value. redb write
//! transactions are serialized, so the rotation's read-check-revoke-insert
//! sequence commits as one unit and two racing rotations of the same token
//! cannot both succeed.
//!
//! ## Storage Layout
//!
//! One file, `auth.redb`, containing:
//!
//! ```text
//! accounts              account_id → StoredAccount (JSON)
//! account_email_index   email → account_id
//! refresh_tokens        token → StoredRefreshToken (JSON)
//! refresh_id_index      token id → token
//! refresh_owner_index   owner_id|token → token
//! ```

pub mod accounts;
pub mod db;
pub mod refresh;

pub use accounts::{AccountRepository, NewAccount, StoredAccount};
pub use db::{AuthDatabase, StorageError, StorageResult};
pub use refresh::{RefreshTokenStore, RotationOutcome, StoredRefreshToken};
