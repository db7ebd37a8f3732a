// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for token expiry timestamps.
//!
//! Expiry instants are Unix seconds, as issued by the renewal endpoint.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as Unix seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Whether a token expiring at `expires_at` can still be used at `now`,
/// leaving `margin_secs` of headroom.
pub fn is_fresh(expires_at: i64, now: i64, margin_secs: i64) -> bool {
    now.saturating_add(margin_secs) < expires_at
}

/// Format a Unix timestamp as RFC3339 using a `Z` suffix, for logs.
pub fn format_unix_rfc3339(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| secs.to_string())
}
