// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

use std::sync::Arc;

use crate::auth::{PolicyTable, TokenCodec};
use crate::session::SessionService;
use crate::storage::AuthDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<AuthDatabase>,
    pub sessions: Arc<SessionService>,
    pub codec: Arc<TokenCodec>,
    pub policies: Arc<PolicyTable>,
}

impl AppState {
    pub fn new(db: Arc<AuthDatabase>, codec: Arc<TokenCodec>, refresh_ttl: chrono::Duration) -> Self {
        let sessions = Arc::new(SessionService::new(db.clone(), codec.clone(), refresh_ttl));
        Self {
            db,
            sessions,
            codec,
            policies: Arc::new(PolicyTable::tasklane()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh state backed by a throwaway database. The TempDir must stay
    /// alive for as long as the state is used.
    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(AuthDatabase::open(&dir.path().join("auth.redb")).unwrap());
        let codec = Arc::new(TokenCodec::new(
            b"test-secret-at-least-32-bytes-long",
            chrono::Duration::minutes(15),
        ));
        (AppState::new(db, codec, chrono::Duration::days(30)), dir)
    }
}
