// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{edge_authenticator, Role},
    models::{
        AccountResponse, LoginRequest, LogoutRequest, MessageResponse, PurgeResponse,
        RefreshRequest, RegisterRequest, SessionResponse, SetActiveRequest, SetActiveResponse,
        TokenPairResponse,
    },
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/admin/accounts/{account_id}/active",
            put(admin::set_account_active),
        )
        .route("/admin/tokens/purge", post(admin::purge_expired_tokens))
        .route("/health", get(health::health))
        .with_state(state.clone());

    Router::new()
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state, edge_authenticator))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::me,
        admin::set_account_active,
        admin::purge_expired_tokens,
        health::health
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            LogoutRequest,
            SetActiveRequest,
            AccountResponse,
            SessionResponse,
            TokenPairResponse,
            MessageResponse,
            SetActiveResponse,
            PurgeResponse,
            Role,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration and session lifecycle"),
        (name = "Admin", description = "Account administration"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ROLES_HEADER, SUBJECT_HEADER};
    use crate::state::tests::test_state;
    use crate::storage::{AccountRepository, NewAccount};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: &str,
        path: &str,
        bearer: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn full_session_lifecycle_over_http() {
        let (state, _dir) = test_state();
        let app = router(state);

        // Register
        let (status, body) = send(
            &app,
            "POST",
            "/v1/auth/register",
            None,
            Some(serde_json::json!({
                "email": "alice@example.com",
                "password": "Password123",
                "display_name": "Alice"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let access = body["access_token"].as_str().unwrap().to_string();
        let refresh = body["refresh_token"].as_str().unwrap().to_string();

        // Me with the fresh access token
        let (status, body) = send(&app, "GET", "/v1/auth/me", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "alice@example.com");

        // Rotate the refresh token
        let (status, body) = send(
            &app,
            "POST",
            "/v1/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let next_refresh = body["refresh_token"].as_str().unwrap().to_string();
        assert_ne!(next_refresh, refresh);

        // Replaying the consumed token is rejected
        let (status, _) = send(
            &app,
            "POST",
            "/v1/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Logout with the successor, then it no longer rotates
        let (status, _) = send(
            &app,
            "POST",
            "/v1/auth/logout",
            Some(&access),
            Some(serde_json::json!({ "refresh_token": next_refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": next_refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer() {
        let (state, _dir) = test_state();
        let app = router(state);

        let (status, body) = send(&app, "GET", "/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error_code"].is_string());

        let (status, _) = send(&app, "GET", "/v1/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn spoofed_envelope_headers_are_ignored() {
        let (state, _dir) = test_state();
        let app = router(state);

        let request = Request::builder()
            .method("GET")
            .uri("/v1/auth/me")
            .header(SUBJECT_HEADER, "forged-subject")
            .header(ROLES_HEADER, "admin")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_enforce_role() {
        let (state, _dir) = test_state();

        // Seed an admin directly in storage, then log in over HTTP.
        let hash = crate::auth::password::hash_password("Password123").unwrap();
        AccountRepository::new(&state.db)
            .create(NewAccount {
                email: "root@example.com".into(),
                password_hash: hash,
                display_name: "Root".into(),
                roles: vec![Role::Admin],
            })
            .unwrap();

        let app = router(state.clone());

        let member = state
            .sessions
            .register("eve@example.com", "Password123", "Eve")
            .unwrap();

        let (status, _) = send(
            &app,
            "POST",
            "/v1/admin/tokens/purge",
            Some(&member.access_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            "POST",
            "/v1/auth/login",
            None,
            Some(serde_json::json!({
                "email": "root@example.com",
                "password": "Password123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let admin_access = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            "/v1/admin/tokens/purge",
            Some(&admin_access),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["purged"], 0);
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _dir) = test_state();
        let app = router(state);

        let (status, body) = send(&app, "GET", "/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
