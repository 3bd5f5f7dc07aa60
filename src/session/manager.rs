//! In-memory registry of live sessions.

use super::Session;
use crate::error::{Result, TubechatError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Shared handle to one session. Holding the lock serializes actions on it.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns every live session, keyed by ID.
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a new, uninitialized session.
    pub fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id();
        self.write().insert(id, Arc::new(Mutex::new(session)));
        info!("Created session {}", id);
        id
    }

    /// Look up a live session.
    pub fn get(&self, id: &Uuid) -> Result<SessionHandle> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| TubechatError::SessionNotFound(id.to_string()))
    }

    /// Like [`get`](Self::get), but accepts the ID as text.
    pub fn get_str(&self, id: &str) -> Result<SessionHandle> {
        let id = Uuid::parse_str(id).map_err(|_| TubechatError::SessionNotFound(id.to_string()))?;
        self.get(&id)
    }

    /// End a session and tear down its index. Returns false if it did not exist.
    pub async fn end(&self, id: &Uuid) -> bool {
        let removed = self.write().remove(id);
        match removed {
            Some(handle) => {
                let mut session = handle.lock().await;
                session.discard_video().await;
                info!("Ended session {}", id);
                true
            }
            None => false,
        }
    }

    /// End every session idle for longer than the configured timeout.
    ///
    /// Sessions that are busy (locked by a running request) are skipped.
    pub async fn reap_idle(&self) -> usize {
        let expired: Vec<Uuid> = self
            .read()
            .iter()
            .filter_map(|(id, handle)| {
                let session = handle.try_lock().ok()?;
                (session.idle_for() > self.idle_timeout).then_some(*id)
            })
            .collect();

        let mut ended = 0;
        for id in expired {
            if self.end(&id).await {
                ended += 1;
            }
        }
        if ended > 0 {
            info!("Reaped {} idle sessions", ended);
        } else {
            debug!("No idle sessions to reap");
        }
        ended
    }

    /// End all sessions (server shutdown).
    pub async fn shutdown(&self) {
        let ids: Vec<Uuid> = self.read().keys().copied().collect();
        for id in ids {
            self.end(&id).await;
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}
