// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Tasklane Auth - Authentication & Session Lifecycle Service
//!
//! This crate issues short-lived signed access tokens and long-lived
//! single-use refresh tokens for the Tasklane platform, verifies bearer
//! tokens at the gateway boundary, and propagates verified identity to
//! internal services through trusted envelope headers.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, route policy, edge middleware, identity extractor
//! - `session` - Registration, login, refresh rotation, logout
//! - `storage` - Account and refresh token persistence (redb)
//! - `client` - Session-aware HTTP client for other Tasklane services

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod token_sweeper;
