// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. There is no
//! config file layer: the service runs in containers where the environment
//! is the source of truth.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the token database | `/data` |
//! | `TASKLANE_JWT_SECRET` | HMAC key for access token signing | Required |
//! | `ACCESS_TOKEN_TTL_SECS` | Access token lifetime | `900` (15 min) |
//! | `REFRESH_TOKEN_TTL_SECS` | Refresh token lifetime | `2592000` (30 days) |
//! | `SWEEP_INTERVAL_SECS` | Expired-token sweep interval | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

use chrono::Duration;

const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub sweep_interval_secs: u64,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Fails fast on a missing or undersized signing secret and on
    /// unparseable numeric values rather than falling back silently.
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("TASKLANE_JWT_SECRET")
            .map_err(|_| "TASKLANE_JWT_SECRET must be set".to_string())?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(format!(
                "TASKLANE_JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes"
            ));
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/data")),
            jwt_secret,
            access_token_ttl: Duration::seconds(parse_env("ACCESS_TOKEN_TTL_SECS", 900)?),
            refresh_token_ttl: Duration::seconds(parse_env("REFRESH_TOKEN_TTL_SECS", 2_592_000)?),
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", 3600)?,
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
