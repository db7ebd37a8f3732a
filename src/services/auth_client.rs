// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the backend's session endpoints.
//!
//! Handles:
//! - Exchanging a refresh token for a new token pair
//! - Best-effort server-side logout

use crate::config::Config;
use crate::error::AuthError;
use crate::models::{LogoutRequest, RefreshRequest, TokenRefreshResponse};

/// Renewal endpoint path.
pub const REFRESH_ENDPOINT: &str = "/api/auth/refresh";

/// Logout endpoint path.
pub const LOGOUT_ENDPOINT: &str = "/api/auth/logout";

/// HTTP client for the auth endpoints. Requests carry no bearer credential.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    refresh_url: String,
    logout_url: String,
}

impl AuthClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            refresh_url: config.endpoint_url(REFRESH_ENDPOINT),
            logout_url: config.endpoint_url(LOGOUT_ENDPOINT),
        }
    }

    /// Exchange a refresh token for a new access/refresh pair.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AuthError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(status));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }

    /// Ask the backend to invalidate a refresh token. The response body is ignored.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let body = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };

        let response = self
            .http
            .post(&self.logout_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("Logout request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status()));
        }
        Ok(())
    }
}
