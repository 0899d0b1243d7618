// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! Admin-only endpoints. Role enforcement happens at the edge layer
//! (`/v1/admin` requires the admin role), so handlers here assume an
//! already-authorized caller and use the identity only for audit logs.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::{
    auth::Identity,
    models::{PurgeResponse, SetActiveRequest, SetActiveResponse},
    session::SessionError,
    state::AppState,
};

#[utoipa::path(
    put,
    path = "/v1/admin/accounts/{account_id}/active",
    params(
        ("account_id" = String, Path, description = "Account to enable or disable")
    ),
    request_body = SetActiveRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, body = SetActiveResponse),
        (status = 403, description = "Caller lacks the admin role"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn set_account_active(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<SetActiveResponse>, SessionError> {
    let (account, tokens_revoked) = state.sessions.set_active(&account_id, request.active)?;

    info!(
        admin_id = %identity.subject_id,
        account_id = %account.id,
        active = request.active,
        "admin changed account active flag"
    );

    Ok(Json(SetActiveResponse {
        account: account.into(),
        tokens_revoked,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/admin/tokens/purge",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, body = PurgeResponse),
        (status = 403, description = "Caller lacks the admin role")
    )
)]
pub async fn purge_expired_tokens(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<Json<PurgeResponse>, SessionError> {
    let purged = state.sessions.purge_expired_tokens()?;

    info!(admin_id = %identity.subject_id, purged, "admin triggered token purge");

    Ok(Json(PurgeResponse { purged }))
}
