//! services/api/src/adapters/memory_store.rs
//!
//! This module contains the in-process conversation store, the concrete
//! implementation of the `SessionStore` port from the `core` crate.
//!
//! Sessions live only in memory. The store is bounded: it holds at most
//! `capacity` sessions (evicting the least recently active one to make room)
//! and forgets sessions that have been idle for longer than `ttl`.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use nurse_ally_core::domain::{Message, Session};
use nurse_ally_core::ports::{PortError, PortResult, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A bounded, TTL-evicting in-memory implementation of `SessionStore`.
///
/// The map lock is held only long enough to look up, insert or remove an
/// entry. Appends for one user serialize on that user's own mutex, so
/// different users never wait on each other.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    capacity: usize,
    ttl: TimeDelta,
}

impl InMemorySessionStore {
    /// Creates a new `InMemorySessionStore`.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every session idle for longer than the TTL.
    pub async fn evict_expired(&self) -> usize {
        match Utc::now().checked_sub_signed(self.ttl) {
            Some(cutoff) => self.evict_idle_since(cutoff).await,
            None => 0,
        }
    }

    /// Removes every session whose last activity is strictly before `cutoff`.
    pub async fn evict_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut stale = Vec::new();
        for (user_id, entry) in sessions.iter() {
            if entry.lock().await.last_active_at < cutoff {
                stale.push(user_id.clone());
            }
        }
        for user_id in &stale {
            sessions.remove(user_id);
        }
        stale.len()
    }

    /// Drops all sessions. Called on shutdown.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_active_at > self.ttl
    }

    /// Returns the live session entry for `user_id`, if any. Expired entries
    /// are removed and reported as absent.
    async fn live_entry(&self, user_id: &str) -> Option<Arc<Mutex<Session>>> {
        let entry = self.sessions.read().await.get(user_id).cloned()?;
        if self.is_expired(&*entry.lock().await, Utc::now()) {
            let mut sessions = self.sessions.write().await;
            // Only remove the entry we inspected; a concurrent append may have replaced it.
            if sessions.get(user_id).is_some_and(|current| Arc::ptr_eq(current, &entry)) {
                sessions.remove(user_id);
                debug!(user_id, "Dropped expired session");
            }
            return None;
        }
        Some(entry)
    }

    /// Returns the session entry for `user_id`, creating it if needed.
    async fn entry_or_create(&self, user_id: &str) -> Arc<Mutex<Session>> {
        if let Some(entry) = self.live_entry(user_id).await {
            return entry;
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(user_id) {
            // Another request created it between our read and write locks.
            return entry.clone();
        }

        if sessions.len() >= self.capacity {
            let mut oldest: Option<(String, DateTime<Utc>)> = None;
            for (id, entry) in sessions.iter() {
                let last_active = entry.lock().await.last_active_at;
                if oldest.as_ref().map_or(true, |(_, t)| last_active < *t) {
                    oldest = Some((id.clone(), last_active));
                }
            }
            if let Some((evicted, _)) = oldest {
                sessions.remove(&evicted);
                debug!(user_id = %evicted, "Evicted least recently active session");
            }
        }

        let entry = Arc::new(Mutex::new(Session::new(user_id)));
        sessions.insert(user_id.to_string(), entry.clone());
        entry
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(&self, user_id: &str, message: Message) -> PortResult<()> {
        if user_id.is_empty() {
            return Err(PortError::Unexpected("user_id must not be empty".to_string()));
        }
        let entry = self.entry_or_create(user_id).await;
        entry.lock().await.push(message);
        Ok(())
    }

    async fn history(&self, user_id: &str) -> PortResult<Vec<Message>> {
        match self.live_entry(user_id).await {
            Some(entry) => Ok(entry.lock().await.messages.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn reset(&self, user_id: &str) -> PortResult<()> {
        if self.sessions.write().await.remove(user_id).is_some() {
            debug!(user_id, "Session reset");
        }
        Ok(())
    }
}

//=========================================================================================
// Background Sweeper
//=========================================================================================

/// Spawns a task that evicts expired sessions every `interval` until `shutdown`
/// is cancelled.
pub fn spawn_sweeper(
    store: Arc<InMemorySessionStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session sweeper stopped.");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = store.evict_expired().await;
                    if evicted > 0 {
                        info!(evicted, "Evicted expired sessions");
                    }
                }
            }
        }
    })
}
