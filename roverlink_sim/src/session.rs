//! In-memory registry of connected rover sessions.

use roverlink_core::{ConnectionState, Session};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Table of rover sessions keyed by rover id.
///
/// The session map lock is only held for single lookups or updates and
/// never across an `.await`, so operations on distinct ids do not wait on
/// each other. Batches for the *same* id are serialized through
/// [`SessionRegistry::batch_guard`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,

    /// Per-id batch locks, present only while a batch holds or awaits one
    batch_locks: Mutex<BatchLocks>,
}

type BatchLocks = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Exclusive batch access to one rover id.
///
/// Dropping the last guard for an id removes its lock entry.
pub struct BatchGuard<'a> {
    rover_id: String,
    locks: &'a Mutex<BatchLocks>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the Arc under this same lock, so a count of one means
        // nobody else is queued on the id.
        if locks.get(&self.rover_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.rover_id);
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, replacing any existing one for the same id.
    pub fn insert(&self, session: Session) -> Option<Session> {
        self.sessions().insert(session.rover_id.clone(), session)
    }

    pub fn remove(&self, rover_id: &str) -> Option<Session> {
        self.sessions().remove(rover_id)
    }

    pub fn get(&self, rover_id: &str) -> Option<Session> {
        self.sessions().get(rover_id).cloned()
    }

    pub fn contains(&self, rover_id: &str) -> bool {
        self.sessions().contains_key(rover_id)
    }

    /// Applies `f` to the session in place. `None` if there is no session.
    pub fn update<R>(&self, rover_id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.sessions().get_mut(rover_id).map(f)
    }

    /// Connection state, `Disconnected` when no session exists.
    pub fn connection_state(&self, rover_id: &str) -> ConnectionState {
        self.sessions()
            .get(rover_id)
            .map(|s| s.connection_state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Sorted ids of all sessions.
    pub fn rover_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Waits for exclusive batch access to `rover_id`.
    ///
    /// Held for the whole duration of a command batch.
    pub async fn batch_guard(&self, rover_id: &str) -> BatchGuard<'_> {
        let lock = {
            let mut locks = self.batch_locks();
            Arc::clone(locks.entry(rover_id.to_string()).or_default())
        };
        let mut guard = BatchGuard {
            rover_id: rover_id.to_string(),
            locks: &self.batch_locks,
            guard: None,
        };
        guard.guard = Some(lock.lock_owned().await);
        guard
    }

    /// Number of ids with a batch running or queued.
    pub fn batch_lock_count(&self) -> usize {
        self.batch_locks().len()
    }

    fn batch_locks(&self) -> MutexGuard<'_, BatchLocks> {
        self.batch_locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
