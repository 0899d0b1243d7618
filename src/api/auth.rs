// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Identity,
    models::{
        AccountResponse, LoginRequest, LogoutRequest, MessageResponse, RefreshRequest,
        RegisterRequest, SessionResponse, TokenPairResponse,
    },
    session::SessionError,
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, body = SessionResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid email or weak password")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), SessionError> {
    let session = state
        .sessions
        .register(&request.email, &request.password, &request.display_name)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            account: session.account.into(),
            access_token: session.access_token,
            refresh_token: session.refresh_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = SessionResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, SessionError> {
    let session = state.sessions.login(&request.email, &request.password)?;

    Ok(Json(SessionResponse {
        account: session.account.into(),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, body = TokenPairResponse),
        (status = 401, description = "Refresh token unknown, expired, or already used"),
        (status = 403, description = "Account disabled")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, SessionError> {
    let rotated = state.sessions.refresh(&request.refresh_token)?;

    Ok(Json(TokenPairResponse {
        access_token: rotated.access_token,
        refresh_token: rotated.refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = LogoutRequest,
    tag = "Auth",
    responses((status = 200, body = MessageResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, SessionError> {
    state.sessions.logout(&request.refresh_token)?;

    Ok(Json(MessageResponse {
        message: "logged out".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = AccountResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<Json<AccountResponse>, SessionError> {
    let account = state.sessions.whoami(&identity.subject_id)?;
    Ok(Json(account.into()))
}
