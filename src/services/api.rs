// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated request dispatcher.
//!
//! Every backend call made by the application goes through [`ApiClient`]:
//! - The current access token is attached unless the call opts out
//! - A 401 on an authenticated call forces one renewal and one retry
//! - A second 401, or a failed renewal, ends the session and sends the
//!   application to its login route

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::services::navigator::LoginNavigator;
use crate::services::session::SessionStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Extra headers; these override the default content type.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any
    pub body: Option<serde_json::Value>,
    /// Send without a credential (public endpoints)
    pub skip_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            skip_auth: false,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Backend API client with credential injection and one retry on expiry.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<Config>,
    session: SessionStore,
    navigator: Arc<dyn LoginNavigator>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        config: Arc<Config>,
        session: SessionStore,
        navigator: Arc<dyn LoginNavigator>,
    ) -> Self {
        Self {
            http,
            config,
            session,
            navigator,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Perform a call and decode its JSON body.
    ///
    /// An empty success body decodes as JSON `null`, so `T = ()` works for
    /// endpoints that return nothing.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let url = self.config.endpoint_url(endpoint);

        let token = if options.skip_auth {
            None
        } else {
            self.session.get_access_token().await
        };

        let mut response = self.send(&url, &options, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && token.is_some() {
            response = self.retry_after_renewal(endpoint, &url, &options).await?;
        }

        parse_response(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(endpoint, RequestOptions::new(Method::GET)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.request(endpoint, RequestOptions::new(Method::POST).with_body(to_json(body)?))
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.request(endpoint, RequestOptions::new(Method::PUT).with_body(to_json(body)?))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        self.request(
            endpoint,
            RequestOptions::new(Method::PATCH).with_body(to_json(body)?),
        )
        .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(endpoint, RequestOptions::new(Method::DELETE)).await
    }

    /// The backend rejected our token: its verdict beats the cached expiry,
    /// so renew unconditionally and try exactly once more.
    async fn retry_after_renewal(
        &self,
        endpoint: &str,
        url: &str,
        options: &RequestOptions,
    ) -> Result<reqwest::Response> {
        tracing::info!(endpoint, "Request unauthorized, renewing session and retrying");

        let Some(token) = self.session.force_refresh().await else {
            return Err(self.end_session(endpoint).await);
        };

        let response = self.send(url, options, Some(&token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(self.end_session(endpoint).await);
        }
        Ok(response)
    }

    async fn end_session(&self, endpoint: &str) -> ApiError {
        tracing::warn!(endpoint, "Session could not be recovered, logging out");
        self.session.logout().await;
        self.navigator.redirect_to_login(&self.config.login_path);
        ApiError::SessionExpired
    }

    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(options.method.clone(), url)
            .headers(build_headers(options, token)?);

        if let Some(body) = &options.body {
            request = request.body(serde_json::to_vec(body).map_err(|e| {
                ApiError::InvalidRequest(format!("Failed to encode body: {}", e))
            })?);
        }

        request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))
}

/// Default content type, then caller headers, then the credential.
fn build_headers(options: &RequestOptions, token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid value for {name}: {e}")))?;
        headers.insert(name, value);
    }

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid access token: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// Check response status and decode the JSON body.
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status,
            message: error_message(status, &body),
        });
    }

    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

/// Body `error`, then body `message`, then the status line.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(key)?.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| status.to_string())
}
