// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Session lifecycle errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::storage::StorageError;

/// Errors returned by the session issuer.
///
/// Unknown email and wrong password collapse into `InvalidCredentials` so
/// login cannot be used to enumerate accounts. `AccountDisabled` is only
/// disclosed after the password check succeeds.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Email is already registered")]
    EmailAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Refresh token is invalid")]
    InvalidRefreshToken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("token error: {0}")]
    Token(#[from] AuthError),
}

#[derive(Serialize)]
struct SessionErrorBody {
    error: String,
    error_code: String,
}

impl SessionError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::EmailAlreadyExists => "email_already_exists",
            SessionError::InvalidCredentials => "invalid_credentials",
            SessionError::AccountDisabled => "account_disabled",
            SessionError::InvalidRefreshToken => "invalid_refresh_token",
            SessionError::AccountNotFound => "account_not_found",
            SessionError::Validation(_) => "validation_failed",
            SessionError::Internal(_) | SessionError::Storage(_) | SessionError::Token(_) => {
                "internal_error"
            }
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::EmailAlreadyExists => StatusCode::CONFLICT,
            SessionError::InvalidCredentials | SessionError::InvalidRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            SessionError::AccountDisabled => StatusCode::FORBIDDEN,
            SessionError::AccountNotFound => StatusCode::NOT_FOUND,
            SessionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::Internal(_) | SessionError::Storage(_) | SessionError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage and token internals stay out of responses
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "session operation failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(SessionErrorBody {
            error: message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_codes_match_contract() {
        assert_eq!(
            SessionError::EmailAlreadyExists.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SessionError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SessionError::AccountDisabled.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            SessionError::InvalidRefreshToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SessionError::AccountNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let err = SessionError::Internal("argon2 parameter mismatch".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn invalid_credentials_body_has_error_code() {
        let response = SessionError::InvalidCredentials.into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "invalid_credentials");
    }
}
