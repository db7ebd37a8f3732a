// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the session and request layers.

use reqwest::StatusCode;

/// Failure surfaced to callers of the request dispatcher.
///
/// A missing credential and a failed renewal never appear here; the session
/// store represents both as the absence of a token.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(String),

    /// Authorization failed and could not be recovered by renewal.
    /// The session has been cleared and the login surface requested.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Success status but the body could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Non-success status, with the clearest message available.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The caller supplied a header that cannot be sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether this failure ended the session.
    pub fn is_auth_error(&self) -> bool {
        match self {
            ApiError::SessionExpired => true,
            ApiError::Status { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }
}

/// Failure of the renewal or logout exchange. Internal to the session store.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Auth request failed: {0}")]
    Transport(String),

    #[error("Auth endpoint rejected request with status {0}")]
    Rejected(StatusCode),

    #[error("Failed to parse auth response: {0}")]
    MalformedResponse(String),
}

/// Failure of a session persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to encode session entry: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type alias for dispatcher calls
pub type Result<T> = std::result::Result<T, ApiError>;
