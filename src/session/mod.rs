// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Session lifecycle: registration, login, refresh rotation, logout.

pub mod error;
pub mod service;

pub use error::SessionError;
pub use service::{IssuedSession, RotatedPair, SessionService};
