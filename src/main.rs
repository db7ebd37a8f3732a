// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lead-client command line
//!
//! Restores the persisted session and performs one authenticated GET
//! against the backend, printing the JSON response.

use lead_client::{config::Config, AppContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(api = %config.api_base_url, "Starting lead-client");

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/api/auth/me".to_string());

    let ctx = AppContext::from_config(config)?;
    tracing::info!(
        authenticated = ctx.session.is_authenticated(),
        "Session loaded"
    );

    let body: serde_json::Value = ctx.api.get(&endpoint).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Initialize structured JSON logging on stderr.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lead_client=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
