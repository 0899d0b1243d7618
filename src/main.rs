// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tasklane_auth::api::router;
use tasklane_auth::auth::TokenCodec;
use tasklane_auth::config::{Config, LogFormat};
use tasklane_auth::state::AppState;
use tasklane_auth::storage::AuthDatabase;
use tasklane_auth::token_sweeper::TokenSweeper;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("configuration error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let db = match AuthDatabase::open(&config.data_dir.join("auth.redb")) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "failed to open token database");
            return ExitCode::FAILURE;
        }
    };

    let codec = Arc::new(TokenCodec::new(
        config.jwt_secret.as_bytes(),
        config.access_token_ttl,
    ));
    let state = AppState::new(db, codec, config.refresh_token_ttl);

    let shutdown = CancellationToken::new();
    let sweeper = TokenSweeper::new(state.sessions.clone())
        .with_interval(std::time::Duration::from_secs(config.sweep_interval_secs));
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(state);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, "Tasklane auth service listening (docs at /docs)");

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.cancel();
    let _ = sweeper_handle.await;

    match serve_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server error");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
