// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session credential store.
//!
//! Sole owner of the access/refresh token pair and the cached user and
//! account snapshots. Responsibilities:
//! - Restoring the persisted session at startup (wiping it if inconsistent)
//! - Handing out a valid access token, renewing it when expired
//! - Making sure at most one renewal request is in flight per store
//! - Persisting every change and notifying subscribers

use crate::error::StorageError;
use crate::models::{Account, SessionCredential, TokenRefreshResponse, User};
use crate::services::auth_client::AuthClient;
use crate::storage::{keys, SessionStorage};
use crate::time_utils::{format_unix_rfc3339, is_fresh, unix_now};
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Callback invoked after every session mutation.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

type Listeners = Arc<DashMap<u64, Listener>>;

/// Outcome of the renewal every concurrent caller awaits.
type RenewalFuture = Shared<BoxFuture<'static, Option<String>>>;

struct InFlightRenewal {
    id: u64,
    future: RenewalFuture,
}

struct Inner {
    state: RwLock<SessionCredential>,
    storage: Arc<dyn SessionStorage>,
    auth: AuthClient,
    refresh_margin_secs: i64,
    /// Pending renewal shared by all callers, if any.
    renewal: Mutex<Option<InFlightRenewal>>,
    next_renewal_id: AtomicU64,
    listeners: Listeners,
    next_listener_id: AtomicU64,
}

/// Handle to the process-wide session. Clones share the same state.
///
/// Built once by the composition root and handed to whatever needs a
/// credential.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

/// Registration returned by [`SessionStore::subscribe`].
///
/// Dropping it leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    listeners: Weak<DashMap<u64, Listener>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(&self.id);
        }
    }
}

/// Clears the in-flight slot when the renewal task ends, however it ends.
struct RenewalSlotGuard {
    store: SessionStore,
    id: u64,
}

impl Drop for RenewalSlotGuard {
    fn drop(&mut self) {
        let mut slot = self.store.lock_renewal();
        if slot.as_ref().is_some_and(|r| r.id == self.id) {
            *slot = None;
        }
    }
}

/// Why a persisted session was rejected at startup.
#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("missing entry {0}")]
    Missing(&'static str),

    #[error("access token and expiry are not both present")]
    AccessOutOfSync,

    #[error("invalid expiry {0:?}")]
    InvalidExpiry(String),

    #[error("invalid {key} snapshot: {source}")]
    Snapshot {
        key: &'static str,
        source: serde_json::Error,
    },
}

impl SessionStore {
    /// Create the store and restore whatever session `storage` holds.
    ///
    /// A partially present or unparsable session is wiped entirely.
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        auth: AuthClient,
        refresh_margin_secs: i64,
    ) -> Self {
        let store = Self {
            inner: Arc::new(Inner {
                state: RwLock::new(SessionCredential::default()),
                storage,
                auth,
                refresh_margin_secs,
                renewal: Mutex::new(None),
                next_renewal_id: AtomicU64::new(1),
                listeners: Arc::new(DashMap::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        };

        match load_session(store.inner.storage.as_ref()) {
            Ok(Some(session)) => {
                tracing::info!(
                    has_access_token = session.access_token.is_some(),
                    expires_at = ?session.expires_at.map(format_unix_rfc3339),
                    "Session restored"
                );
                *store.write_state() = session;
            }
            Ok(None) => tracing::debug!("No persisted session"),
            Err(e) => {
                tracing::warn!(reason = %e, "Persisted session is inconsistent, clearing");
                store.clear();
            }
        }

        store
    }

    // ─── Token Access ────────────────────────────────────────────────────────

    /// Get a usable access token, renewing it if the cached one has expired.
    ///
    /// Returns `None` when there is no session or renewal failed. Concurrent
    /// callers share a single renewal request and all see its outcome.
    pub async fn get_access_token(&self) -> Option<String> {
        {
            let state = self.read_state();
            if !state.is_authenticated() {
                return None;
            }
            if let Some((token, expires_at)) = state.access() {
                if is_fresh(expires_at, unix_now(), self.inner.refresh_margin_secs) {
                    return Some(token.to_string());
                }
            }
        }

        self.renewal().await
    }

    /// Renew regardless of the cached expiry.
    ///
    /// Used after the backend rejected a token the store still considered
    /// valid. Joins a renewal already in flight instead of starting another.
    pub async fn force_refresh(&self) -> Option<String> {
        if !self.is_authenticated() {
            return None;
        }
        self.renewal().await
    }

    /// Return the in-flight renewal, starting one if none is pending.
    fn renewal(&self) -> RenewalFuture {
        let mut slot = self.lock_renewal();
        if let Some(in_flight) = slot.as_ref() {
            tracing::debug!(renewal_id = in_flight.id, "Joining in-flight session renewal");
            return in_flight.future.clone();
        }

        let id = self.inner.next_renewal_id.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.inner);

        // The request runs as its own task so an abandoned caller cannot
        // strand the others. It starts on first poll, outside the slot lock.
        let future = async move {
            let inner = weak.upgrade()?;
            let guard = RenewalSlotGuard {
                store: SessionStore { inner },
                id,
            };
            let task = tokio::spawn(async move { guard.store.run_renewal().await });
            match task.await {
                Ok(token) => token,
                Err(e) => {
                    tracing::error!(renewal_id = id, error = %e, "Session renewal task failed");
                    None
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlightRenewal {
            id,
            future: future.clone(),
        });
        future
    }

    async fn run_renewal(&self) -> Option<String> {
        let refresh_token = self.read_state().refresh_token.clone()?;

        tracing::info!("Access token expired, renewing session");

        match self.inner.auth.refresh_token(&refresh_token).await {
            Ok(tokens) => self.adopt_renewal(&refresh_token, tokens),
            Err(e) => {
                tracing::warn!(error = %e, "Session renewal failed, clearing session");
                self.clear_if_current(&refresh_token);
                None
            }
        }
    }

    /// Store renewed tokens unless the session changed while renewing.
    fn adopt_renewal(&self, sent: &str, tokens: TokenRefreshResponse) -> Option<String> {
        {
            let mut state = self.write_state();
            if state.refresh_token.as_deref() != Some(sent) {
                tracing::info!("Session changed during renewal, discarding renewed tokens");
                return state.access_token.clone();
            }
            state.access_token = Some(tokens.access_token.clone());
            state.refresh_token = Some(tokens.refresh_token);
            state.expires_at = Some(tokens.expires_at);
            self.persist(&state);
        }
        self.notify();

        tracing::info!(
            expires_at = %format_unix_rfc3339(tokens.expires_at),
            "Session renewed"
        );
        Some(tokens.access_token)
    }

    fn clear_if_current(&self, sent: &str) {
        if self.read_state().refresh_token.as_deref() == Some(sent) {
            self.clear();
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────────

    /// Replace the token triple, e.g. after a login or OAuth exchange.
    pub fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
    ) {
        self.mutate(|state| {
            state.access_token = Some(access_token.into());
            state.refresh_token = Some(refresh_token.into());
            state.expires_at = Some(expires_at);
        });
    }

    /// Replace the cached user and account snapshots.
    pub fn set_user(&self, user: User, account: Option<Account>) {
        self.mutate(|state| {
            state.user = Some(user);
            state.account = account;
        });
    }

    /// Record onboarding progress on the cached user.
    pub fn update_onboarding_status(&self, completed: bool) {
        if self.read_state().user.is_none() {
            tracing::debug!("No cached user, ignoring onboarding status update");
            return;
        }
        self.mutate(|state| {
            if let Some(user) = state.user.as_mut() {
                user.onboarding_completed = completed;
            }
        });
    }

    /// Drop the whole session, in memory and in storage. Idempotent.
    pub fn clear(&self) {
        {
            let mut state = self.write_state();
            *state = SessionCredential::default();
            for key in keys::ALL {
                if let Err(e) = self.inner.storage.remove(key) {
                    tracing::warn!(key, error = %e, "Failed to remove persisted session entry");
                }
            }
        }
        self.notify();
    }

    /// Invalidate the refresh token server-side (best effort), then clear.
    pub async fn logout(&self) {
        let refresh_token = self.read_state().refresh_token.clone();
        if let Some(refresh_token) = refresh_token {
            if let Err(e) = self.inner.auth.logout(&refresh_token).await {
                tracing::warn!(error = %e, "Server-side logout failed, clearing locally");
            }
        }
        self.clear();
        tracing::info!("Logged out");
    }

    // ─── Read / Observe ──────────────────────────────────────────────────────

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated()
    }

    pub fn get_user(&self) -> Option<User> {
        self.read_state().user.clone()
    }

    pub fn get_account(&self) -> Option<Account> {
        self.read_state().account.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_state().refresh_token.clone()
    }

    /// Copy of the whole session.
    pub fn snapshot(&self) -> SessionCredential {
        self.read_state().clone()
    }

    /// Register a callback run after every mutation. Delivery order among
    /// listeners is unspecified.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.inner.listeners),
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn mutate(&self, apply: impl FnOnce(&mut SessionCredential)) {
        {
            let mut state = self.write_state();
            apply(&mut state);
            self.persist(&state);
        }
        self.notify();
    }

    /// Write all entries. Storage failures leave memory authoritative.
    fn persist(&self, state: &SessionCredential) {
        if let Err(e) = write_session(self.inner.storage.as_ref(), state) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    /// Run listeners outside every lock so they may read the store.
    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionCredential> {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionCredential> {
        self.inner.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_renewal(&self) -> std::sync::MutexGuard<'_, Option<InFlightRenewal>> {
        self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn write_session(
    storage: &dyn SessionStorage,
    state: &SessionCredential,
) -> Result<(), StorageError> {
    match state.access() {
        Some((token, expires_at)) => {
            storage.set(keys::ACCESS_TOKEN, token)?;
            storage.set(keys::EXPIRES_AT, &expires_at.to_string())?;
        }
        None => {
            storage.remove(keys::ACCESS_TOKEN)?;
            storage.remove(keys::EXPIRES_AT)?;
        }
    }
    match &state.refresh_token {
        Some(token) => storage.set(keys::REFRESH_TOKEN, token)?,
        None => storage.remove(keys::REFRESH_TOKEN)?,
    }
    storage.set(keys::USER, &serde_json::to_string(&state.user)?)?;
    storage.set(keys::ACCOUNT, &serde_json::to_string(&state.account)?)?;
    Ok(())
}

/// Read the persisted session. `Ok(None)` means nothing was stored.
fn load_session(storage: &dyn SessionStorage) -> Result<Option<SessionCredential>, LoadError> {
    let mut raw = HashMap::new();
    for key in keys::ALL {
        if let Some(value) = storage.get(key)? {
            raw.insert(key, value);
        }
    }
    if raw.is_empty() {
        return Ok(None);
    }

    let refresh_token = raw
        .remove(keys::REFRESH_TOKEN)
        .ok_or(LoadError::Missing(keys::REFRESH_TOKEN))?;

    let (access_token, expires_at) =
        match (raw.remove(keys::ACCESS_TOKEN), raw.remove(keys::EXPIRES_AT)) {
            (Some(token), Some(expires_at)) => {
                let expires_at = expires_at
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| LoadError::InvalidExpiry(expires_at.clone()))?;
                (Some(token), Some(expires_at))
            }
            (None, None) => (None, None),
            _ => return Err(LoadError::AccessOutOfSync),
        };

    Ok(Some(SessionCredential {
        access_token,
        refresh_token: Some(refresh_token),
        expires_at,
        user: decode_snapshot(&mut raw, keys::USER)?,
        account: decode_snapshot(&mut raw, keys::ACCOUNT)?,
    }))
}

fn decode_snapshot<T: DeserializeOwned>(
    raw: &mut HashMap<&'static str, String>,
    key: &'static str,
) -> Result<Option<T>, LoadError> {
    let value = raw.remove(key).ok_or(LoadError::Missing(key))?;
    serde_json::from_str(&value).map_err(|source| LoadError::Snapshot { key, source })
}
