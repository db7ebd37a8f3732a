// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session lifecycle and request dispatch.

pub mod api;
pub mod auth_client;
pub mod navigator;
pub mod session;

pub use api::{ApiClient, RequestOptions};
pub use auth_client::AuthClient;
pub use navigator::{LoggingNavigator, LoginNavigator};
pub use session::{SessionStore, Subscription};
