// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! # Expired Token Sweeper
//!
//! Background task that periodically deletes refresh tokens past their
//! expiry. Expired tokens are already unusable; the sweep only keeps the
//! token store from growing without bound.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::SessionService;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Background sweeper that purges expired refresh tokens.
pub struct TokenSweeper {
    sessions: Arc<SessionService>,
    sweep_interval: Duration,
}

impl TokenSweeper {
    pub fn new(sessions: Arc<SessionService>) -> Self {
        Self {
            sessions,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Token sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Token sweeper shutting down");
                return;
            }

            self.sweep_step();

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Token sweeper shutting down");
                    return;
                }
            }
        }
    }

    fn sweep_step(&self) {
        match self.sessions.purge_expired_tokens() {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Token sweeper: deleted expired refresh tokens"),
            Err(e) => warn!(error = %e, "Token sweeper: purge failed"),
        }
    }
}
