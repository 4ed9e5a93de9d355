//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use checkout::{CheckoutCoordinator, ReceiptHeader, RefundService};
use common::SessionId;
use domain::{CatalogService, DashboardService, Session};
use store::PharmacyStore;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Open terminal sessions.
///
/// Each session sits behind its own mutex so one request at a time works on
/// a given cart, while different terminals proceed independently. Sessions
/// that go unused for the configured idle timeout are evicted by
/// [`crate::spawn_session_reaper`].
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new empty session and returns a snapshot of it.
    pub async fn open(&self) -> Session {
        let session = Session::new();
        let snapshot = session.clone();
        self.sessions.write().await.insert(
            session.id(),
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        metrics::gauge!("open_sessions").increment(1.0);
        snapshot
    }

    /// Looks up a session and marks it as used.
    pub async fn get(&self, id: SessionId) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Closes a session. Returns false when it was not open.
    pub async fn close(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            metrics::gauge!("open_sessions").decrement(1.0);
        }
        removed
    }

    /// Drops sessions last used more than `idle_for` before `now`.
    ///
    /// A session whose lock is held by an in-flight request is kept.
    /// Returns the number of sessions evicted.
    pub async fn evict_idle(&self, now: Instant, idle_for: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            now.saturating_duration_since(entry.last_seen) <= idle_for
                || entry.session.try_lock().is_err()
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            metrics::gauge!("open_sessions").decrement(evicted as f64);
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState<S: PharmacyStore> {
    pub catalog: CatalogService<S>,
    pub coordinator: CheckoutCoordinator<S>,
    pub refunds: RefundService<S>,
    pub dashboard: DashboardService<S>,
    pub sessions: SessionRegistry,
    pub receipt_header: ReceiptHeader,
    pub customer_list_limit: usize,
}

impl<S: PharmacyStore + Clone> AppState<S> {
    /// Wires every service to the same store.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            coordinator: CheckoutCoordinator::new(store.clone()),
            refunds: RefundService::new(store.clone()),
            dashboard: DashboardService::new(store, config.dashboard_settings()),
            sessions: SessionRegistry::new(),
            receipt_header: config.receipt_header.clone(),
            customer_list_limit: config.customer_list_limit,
        }
    }
}
