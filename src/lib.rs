// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lead-client: session and request core for the lead-analysis app
//!
//! This crate owns the bearer credential lifecycle (storage, renewal,
//! logout) and the request layer that injects credentials and recovers
//! from expiry.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

use config::Config;
use services::{ApiClient, AuthClient, LoggingNavigator, LoginNavigator, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use storage::{FileStorage, MemoryStorage, SessionStorage};

/// Composition root: the shared session and the request client built on it.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub session: SessionStore,
    pub api: ApiClient,
}

impl AppContext {
    /// Wire the session store and dispatcher over the given collaborators.
    pub fn new(
        config: Config,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn LoginNavigator>,
    ) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let auth = AuthClient::new(http.clone(), &config);
        let session = SessionStore::new(storage, auth, config.refresh_margin_secs);
        let api = ApiClient::new(http, config.clone(), session.clone(), navigator);

        Ok(Self {
            config,
            session,
            api,
        })
    }

    /// Build with file storage when `session_file` is set, memory otherwise,
    /// and a navigator that only logs.
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let storage: Arc<dyn SessionStorage> = match &config.session_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using file session storage");
                Arc::new(FileStorage::new(path))
            }
            None => {
                tracing::info!("Using in-memory session storage");
                Arc::new(MemoryStorage::new())
            }
        };
        Self::new(config, storage, Arc::new(LoggingNavigator))
    }
}
