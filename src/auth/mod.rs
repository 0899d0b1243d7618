// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! # Authentication Module
//!
//! Token codec, edge authentication, and identity propagation for the
//! Tasklane auth service.
//!
//! ## Request Flow
//!
//! 1. Client sends `Authorization: Bearer <access token>`
//! 2. The edge authenticator middleware:
//!    - Resolves the route's policy from the declarative table
//!    - Verifies signature and expiry (HS256, process-wide secret)
//!    - Enforces role requirements
//!    - Attaches the propagation envelope
//! 3. Handlers and internal collaborators extract `Identity` from the
//!    envelope without re-verifying anything
//!
//! ## Security
//!
//! - Malformed and expired tokens are both reported as 401
//! - Clock skew tolerance is 60 seconds
//! - Inbound envelope headers are stripped at the edge

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod roles;

pub use claims::{AccessClaims, VerifiedIdentity};
pub use codec::TokenCodec;
pub use error::AuthError;
pub use extractor::Identity;
pub use middleware::{edge_authenticator, ROLES_HEADER, SUBJECT_HEADER};
pub use policy::{PolicyTable, RoutePolicy};
pub use roles::Role;
