//! # Session Store
//!
//! In-memory map from session hash to [`Session`], shared by every request.
//!
//! ## Features
//! - **Thread-safe**: a single mutex guards the map; no caller ever sees it
//! - **Short critical sections**: hashing and decoding happen outside the lock
//! - **Snapshots**: lookups return `Arc<Session>` clones that outlive removal
//! - **Expiry**: lookups ignore expired sessions, `prune` removes them in bulk
//!
//! ## Usage
//! ```ignore
//! let store = Arc::new(SessionStore::new());
//! store.add(session);
//! if let Some(session) = store.get(&hash) {
//!     // use the snapshot for the rest of the request
//! }
//! let handle = spawn_pruner(store.clone(), Duration::from_secs(60));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::Session;

/// Thread-safe in-memory session store
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<SessionStoreInner>,
}

#[derive(Debug, Default)]
struct SessionStoreInner {
    /// Session hash -> session
    sessions: HashMap<String, Arc<Session>>,
    total_inserts: u64,
    total_pruned: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The map is always left consistent, so a panic elsewhere never poisons it for good.
    fn lock(&self) -> MutexGuard<'_, SessionStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `session` under its hash.
    ///
    /// Returns `false` and leaves the store untouched if the hash is already present.
    pub fn add(&self, session: Session) -> bool {
        let mut inner = self.lock();
        if inner.sessions.contains_key(session.hash()) {
            debug!("Session hash collision, insert refused");
            return false;
        }

        inner
            .sessions
            .insert(session.hash().to_string(), Arc::new(session));
        inner.total_inserts += 1;

        trace!(session_count = inner.sessions.len(), "Session stored");
        true
    }

    /// Live session for `hash`, if any.
    pub fn get(&self, hash: &str) -> Option<Arc<Session>> {
        self.get_at(hash, SystemTime::now())
    }

    /// Session for `hash` as seen at `now`. An expired entry is evicted and not returned.
    pub fn get_at(&self, hash: &str, now: SystemTime) -> Option<Arc<Session>> {
        let mut inner = self.lock();

        match inner.sessions.get(hash) {
            Some(session) if !session.is_expired_at(now) => {
                trace!("Session lookup hit");
                Some(Arc::clone(session))
            }
            Some(_) => {
                inner.sessions.remove(hash);
                trace!("Session expired on lookup");
                None
            }
            None => {
                trace!("Session lookup miss");
                None
            }
        }
    }

    /// Remove `session`. Returns whether it was present.
    pub fn remove(&self, session: &Session) -> bool {
        self.lock().sessions.remove(session.hash()).is_some()
    }

    /// Remove every session whose expiry is strictly before `now`. Returns the count removed.
    pub fn prune(&self, now: SystemTime) -> usize {
        let mut inner = self.lock();

        let before = inner.sessions.len();
        inner.sessions.retain(|_, session| session.expiry() >= now);
        let removed = before - inner.sessions.len();
        inner.total_pruned += removed as u64;

        if removed > 0 {
            debug!(
                removed_count = removed,
                remaining_count = inner.sessions.len(),
                "Expired sessions pruned"
            );
        }

        removed
    }

    /// First session found for `pid` that began on `url`.
    ///
    /// Other matches are left in place, and expired entries are only dropped by `prune`.
    pub fn find_by_pid_and_url(&self, pid: i32, url: &str) -> Option<Arc<Session>> {
        self.lock()
            .sessions
            .values()
            .find(|s| s.pid() == pid && s.url() == url)
            .cloned()
    }

    /// Every stored session belonging to `game_id`.
    pub fn sessions_for_game(&self, game_id: &str) -> Vec<Arc<Session>> {
        self.lock()
            .sessions
            .values()
            .filter(|s| s.game_id() == game_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Drop every session
    pub fn clear(&self) {
        let mut inner = self.lock();
        let count = inner.sessions.len();
        inner.sessions.clear();
        debug!(cleared_count = count, "Session store cleared");
    }

    /// Get current store statistics
    pub fn stats(&self) -> SessionStoreStats {
        let now = SystemTime::now();
        let inner = self.lock();

        SessionStoreStats {
            total_entries: inner.sessions.len(),
            expired_count: inner
                .sessions
                .values()
                .filter(|s| s.is_expired_at(now))
                .count(),
            total_inserts: inner.total_inserts,
            total_pruned: inner.total_pruned,
        }
    }
}

/// Statistics about the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStoreStats {
    /// Sessions currently held, expired or not
    pub total_entries: usize,
    /// Held sessions already past their expiry
    pub expired_count: usize,
    /// Sessions ever inserted
    pub total_inserts: u64,
    /// Sessions ever removed by `prune`
    pub total_pruned: u64,
}

/// Prune `store` every `interval` on the current tokio runtime.
///
/// The first prune happens one full interval after spawning. Abort the handle to stop.
pub fn spawn_pruner(store: Arc<SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let removed = store.prune(SystemTime::now());
            trace!(removed_count = removed, "Periodic session prune");
        }
    })
}
