// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login navigation hook.
//!
//! When a session cannot be recovered, the dispatcher sends the application
//! to its login surface. What happens after that belongs to the routing layer.

/// Receives the forced navigation to the login route.
pub trait LoginNavigator: Send + Sync {
    fn redirect_to_login(&self, login_path: &str);
}

/// Navigator for headless use: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl LoginNavigator for LoggingNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        tracing::warn!(login_path, "Session ended, login required");
    }
}
