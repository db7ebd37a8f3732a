// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the session and the auth endpoints.

pub mod session;
pub mod user;

pub use session::{LogoutRequest, RefreshRequest, SessionCredential, TokenRefreshResponse};
pub use user::{Account, User};
