// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: a mock backend and a wired-up client.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lead_client::config::Config;
use lead_client::services::LoginNavigator;
use lead_client::storage::MemoryStorage;
use lead_client::time_utils::unix_now;
use lead_client::AppContext;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned reply of the renewal endpoint.
#[derive(Debug, Clone)]
pub struct RefreshReply {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

#[allow(dead_code)]
impl RefreshReply {
    pub fn new(access_token: &str, refresh_token: &str, expires_at: i64) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at,
        }
    }

    /// Reply valid for an hour.
    pub fn fresh(access_token: &str, refresh_token: &str) -> Self {
        Self::new(access_token, refresh_token, unix_now() + 3600)
    }
}

/// Observable state of the mock backend.
#[derive(Default)]
pub struct BackendState {
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub lead_calls: AtomicUsize,
    pub always_401_calls: AtomicUsize,
    /// Delay before the renewal endpoint answers
    pub refresh_delay_ms: AtomicU64,
    /// Replies handed out in order; an empty queue answers 500.
    pub refresh_replies: Mutex<VecDeque<RefreshReply>>,
    pub seen_refresh_tokens: Mutex<Vec<String>>,
    pub seen_logout_tokens: Mutex<Vec<String>>,
    /// Access tokens accepted by protected endpoints
    pub valid_access_tokens: Mutex<HashSet<String>>,
    pub seen_public_auth: Mutex<Vec<Option<String>>>,
}

#[allow(dead_code)]
impl BackendState {
    pub fn queue_refresh(&self, reply: RefreshReply) {
        self.refresh_replies.lock().unwrap().push_back(reply);
    }

    pub fn accept_token(&self, token: &str) {
        self.valid_access_tokens
            .lock()
            .unwrap()
            .insert(token.to_string());
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn lead_count(&self) -> usize {
        self.lead_calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen_refresh_tokens.lock().unwrap().clone()
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = bearer(headers) else {
            return false;
        };
        self.valid_access_tokens.lock().unwrap().contains(&token)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Mock backend listening on an ephemeral local port.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

#[allow(dead_code)]
impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/api/leads", get(leads))
            .route("/api/always-401", get(always_401))
            .route("/api/public/pricing", get(pricing))
            .route("/api/broken", get(broken))
            .route("/api/empty", get(empty))
            .route("/api/fails", get(fails))
            .route("/api/echo", post(echo))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> Config {
        Config {
            api_base_url: self.base_url(),
            request_timeout_secs: 5,
            ..Config::default()
        }
    }
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let sent = body["refreshToken"].as_str().unwrap_or_default().to_string();
    state.seen_refresh_tokens.lock().unwrap().push(sent);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let reply = state.refresh_replies.lock().unwrap().pop_front();
    match reply {
        Some(reply) => {
            state.accept_token(&reply.access_token);
            Json(json!({
                "accessToken": reply.access_token,
                "refreshToken": reply.refresh_token,
                "expiresAt": reply.expires_at,
            }))
            .into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "refresh failed" })),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> StatusCode {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    let sent = body["refreshToken"].as_str().unwrap_or_default().to_string();
    state.seen_logout_tokens.lock().unwrap().push(sent);
    StatusCode::NO_CONTENT
}

async fn leads(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.lead_calls.fetch_add(1, Ordering::SeqCst);
    if !state.is_authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Token expired" })),
        )
            .into_response();
    }
    Json(json!({ "leads": [{ "id": "lead_1", "score": 87 }] })).into_response()
}

async fn always_401(State(state): State<Arc<BackendState>>) -> Response {
    state.always_401_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Invalid token" })),
    )
        .into_response()
}

async fn pricing(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Json<Value> {
    state.seen_public_auth.lock().unwrap().push(bearer(&headers));
    Json(json!({ "plans": ["starter", "growth"] }))
}

async fn broken() -> Response {
    (StatusCode::OK, "definitely not json").into_response()
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fails() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": "Domain is invalid" })),
    )
        .into_response()
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    Json(json!({ "body": body, "contentType": content_type }))
}

/// Navigator that remembers where it was sent.
#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl LoginNavigator for RecordingNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        self.redirects.lock().unwrap().push(login_path.to_string());
    }
}

/// Client wired to `config` with inspectable storage and navigation.
#[allow(dead_code)]
pub struct TestClient {
    pub ctx: AppContext,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
}

#[allow(dead_code)]
pub fn test_client(config: Config) -> TestClient {
    test_client_with_storage(config, Arc::new(MemoryStorage::new()))
}

#[allow(dead_code)]
pub fn test_client_with_storage(config: Config, storage: Arc<MemoryStorage>) -> TestClient {
    let navigator = Arc::new(RecordingNavigator::default());
    let ctx = AppContext::new(config, storage.clone(), navigator.clone())
        .expect("Failed to build client");
    TestClient {
        ctx,
        storage,
        navigator,
    }
}

/// Config pointing at a local port nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_config() -> Config {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Config {
        api_base_url: format!("http://{}", addr),
        request_timeout_secs: 5,
        ..Config::default()
    }
}
