// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Tasklane

//! HTTP client for other Tasklane services.
//!
//! Wraps a `reqwest::Client` with session handling: requests carry the
//! current access token, and a 401 triggers one refresh rotation followed
//! by exactly one retry. Renewal is single-flight: concurrent 401s share
//! one rotation instead of racing to consume the same refresh token.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::models::{
    AccountResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
    SessionResponse, TokenPairResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no active session")]
    NotAuthenticated,
    #[error("session expired and could not be renewed")]
    SessionExpired,
    #[error("api error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Debug, Clone)]
struct SessionTokens {
    access_token: String,
    refresh_token: String,
    /// Bumped on every renewal so a waiter can tell whether another task
    /// already renewed while it was blocked on the renewal lock.
    generation: u64,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<RwLock<Option<SessionTokens>>>,
    renewal: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            session: Arc::new(RwLock::new(None)),
            renewal: Arc::new(Mutex::new(())),
        }
    }

    /// Whether the client currently holds a session.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn store_session(&self, access_token: String, refresh_token: String) {
        let mut guard = self.session.write().await;
        let generation = guard.as_ref().map(|s| s.generation + 1).unwrap_or(0);
        *guard = Some(SessionTokens {
            access_token,
            refresh_token,
            generation,
        });
    }

    /// Register an account and adopt the returned session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AccountResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/register", self.base_url))
            .json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                display_name: display_name.to_string(),
            })
            .send()
            .await?;
        let session: SessionResponse = Self::decode(response).await?;
        self.store_session(session.access_token, session.refresh_token)
            .await;
        Ok(session.account)
    }

    /// Log in and adopt the returned session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AccountResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let session: SessionResponse = Self::decode(response).await?;
        self.store_session(session.access_token, session.refresh_token)
            .await;
        Ok(session.account)
    }

    /// Revoke the held refresh token and drop the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let tokens = {
            let guard = self.session.read().await;
            guard.clone().ok_or(ClientError::NotAuthenticated)?
        };

        let response = self
            .http
            .post(format!("{}/v1/auth/logout", self.base_url))
            .bearer_auth(&tokens.access_token)
            .json(&LogoutRequest {
                refresh_token: tokens.refresh_token,
            })
            .send()
            .await?;

        *self.session.write().await = None;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Fetch the account behind the current session.
    pub async fn me(&self) -> Result<AccountResponse, ClientError> {
        self.get("/v1/auth/me").await
    }

    /// Authenticated GET with automatic renew-and-retry on 401.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(reqwest::Method::GET, path, None::<&()>).await
    }

    /// Authenticated POST with automatic renew-and-retry on 401.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.request(reqwest::Method::POST, path, Some(body)).await
    }

    async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let (access_token, generation) = {
            let guard = self.session.read().await;
            let tokens = guard.as_ref().ok_or(ClientError::NotAuthenticated)?;
            (tokens.access_token.clone(), tokens.generation)
        };

        let response = self
            .send_with_token(method.clone(), path, body, &access_token)
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::decode(response).await;
        }

        debug!(path, "access token rejected, renewing session");
        let renewed_token = self.renew_session(generation).await?;

        // Exactly one retry. A second 401 is a hard failure.
        let response = self
            .send_with_token(method, path, body, &renewed_token)
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::SessionExpired);
        }
        Self::decode(response).await
    }

    async fn send_with_token<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
        access_token: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(access_token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Rotate the refresh token, unless another task already did.
    ///
    /// `observed_generation` is the session generation the caller saw when
    /// its request was rejected. Holding the renewal lock, a generation
    /// that has since moved on means the session was already renewed, so
    /// the waiter reuses it instead of spending the new refresh token.
    async fn renew_session(&self, observed_generation: u64) -> Result<String, ClientError> {
        let _guard = self.renewal.lock().await;

        let refresh_token = {
            let session = self.session.read().await;
            match session.as_ref() {
                Some(tokens) if tokens.generation != observed_generation => {
                    return Ok(tokens.access_token.clone());
                }
                Some(tokens) => tokens.refresh_token.clone(),
                None => return Err(ClientError::SessionExpired),
            }
        };

        let response = self
            .http
            .post(format!("{}/v1/auth/refresh", self.base_url))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            *self.session.write().await = None;
            return Err(ClientError::SessionExpired);
        }

        let pair: TokenPairResponse = Self::decode(response).await?;
        let access = pair.access_token.clone();
        self.store_session(pair.access_token, pair.refresh_token)
            .await;
        Ok(access)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body["error"].as_str().unwrap_or("unknown error").to_string(),
            Err(_) => "unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::state::tests::test_state;
    use crate::storage::RefreshTokenStore;

    async fn spawn_server() -> (String, crate::state::AppState, tempfile::TempDir) {
        let (state, dir) = test_state();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state, dir)
    }

    async fn poison_access_token(client: &ApiClient) {
        let mut guard = client.session.write().await;
        if let Some(tokens) = guard.as_mut() {
            tokens.access_token = "poisoned".to_string();
        }
    }

    #[tokio::test]
    async fn register_then_me_roundtrip() {
        let (base_url, _state, _dir) = spawn_server().await;
        let client = ApiClient::new(base_url);

        let account = client
            .register("alice@example.com", "Password123", "Alice")
            .await
            .unwrap();
        assert_eq!(account.email, "alice@example.com");

        let me = client.me().await.unwrap();
        assert_eq!(me.id, account.id);
    }

    #[tokio::test]
    async fn me_without_session_fails_locally() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn rejected_access_token_is_renewed_transparently() {
        let (base_url, _state, _dir) = spawn_server().await;
        let client = ApiClient::new(base_url);

        let account = client
            .register("bob@example.com", "Password123", "Bob")
            .await
            .unwrap();

        poison_access_token(&client).await;

        // The 401 triggers a refresh rotation and a retried request.
        let me = client.me().await.unwrap();
        assert_eq!(me.id, account.id);
    }

    #[tokio::test]
    async fn concurrent_rejections_share_one_renewal() {
        let (base_url, state, _dir) = spawn_server().await;
        let client = Arc::new(ApiClient::new(base_url));

        let account = client
            .register("carol@example.com", "Password123", "Carol")
            .await
            .unwrap();

        poison_access_token(&client).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = client.clone();
            handles.push(tokio::spawn(async move { client.me().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        // One registration token plus exactly one rotation successor.
        let outstanding = RefreshTokenStore::new(&state.db)
            .count_for_owner(&account.id)
            .unwrap();
        assert_eq!(outstanding, 2);
    }

    #[tokio::test]
    async fn revoked_session_surfaces_session_expired() {
        let (base_url, _state, _dir) = spawn_server().await;
        let client = ApiClient::new(base_url);

        client
            .register("dave@example.com", "Password123", "Dave")
            .await
            .unwrap();

        // Revoke the refresh token server-side, then poison the access
        // token so renewal is forced and fails.
        let refresh_token = client
            .session
            .read()
            .await
            .as_ref()
            .unwrap()
            .refresh_token
            .clone();
        let logout_client = ApiClient::new(client.base_url.clone());
        let _ = logout_client
            .http
            .post(format!("{}/v1/auth/refresh", client.base_url))
            .json(&RefreshRequest {
                refresh_token: refresh_token.clone(),
            })
            .send()
            .await
            .unwrap();
        poison_access_token(&client).await;

        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
        assert!(!client.is_authenticated().await);
    }
}
