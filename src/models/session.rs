// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session credential and the wire bodies of the auth endpoints.

use super::{Account, User};
use serde::{Deserialize, Serialize};

/// In-memory session state owned by the session store.
///
/// `access_token` and `expires_at` are set or cleared together. A refresh
/// token without an access token is an expired session awaiting renewal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCredential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<i64>,
    pub user: Option<User>,
    pub account: Option<Account>,
}

impl SessionCredential {
    /// The presence of a refresh token is what "authenticated" means.
    pub fn is_authenticated(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Access token and its expiry, only when both are present.
    pub fn access(&self) -> Option<(&str, i64)> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) => Some((token.as_str(), expires_at)),
            _ => None,
        }
    }
}

/// Body of `POST /api/auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body of `POST /api/auth/logout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Successful renewal response. The refresh token may be rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}
