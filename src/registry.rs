//! Per-session transaction bookkeeping and the registry that owns it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Result;
use crate::session::SessionId;

/// Bookkeeping for one open transaction.
///
/// `initial_auto_commit` is captured exactly once when the transaction
/// begins and read exactly once at teardown. The checkpoint table maps
/// caller-chosen names to the driver's savepoint tokens; names are unique
/// among currently-live checkpoints only.
pub struct SessionState<S> {
    initial_auto_commit: bool,
    checkpoints: Mutex<HashMap<String, S>>,
}

impl<S> SessionState<S> {
    /// Creates bookkeeping capturing the session's pre-transaction
    /// auto-commit mode.
    pub fn new(initial_auto_commit: bool) -> Self {
        Self {
            initial_auto_commit,
            checkpoints: Mutex::new(HashMap::new()),
        }
    }

    /// The auto-commit mode to restore at teardown.
    pub fn initial_auto_commit(&self) -> bool {
        self.initial_auto_commit
    }

    /// Records a live checkpoint. A name freed by release or rollback may
    /// be reused.
    pub fn add_checkpoint(&self, name: impl Into<String>, token: S) {
        self.checkpoints.lock().insert(name.into(), token);
    }

    /// Removes and returns the token for `name`, consuming the checkpoint.
    pub fn take_checkpoint(&self, name: &str) -> Option<S> {
        self.checkpoints.lock().remove(name)
    }

    /// Whether `name` is currently a live checkpoint.
    pub fn has_checkpoint(&self, name: &str) -> bool {
        self.checkpoints.lock().contains_key(name)
    }

    /// Number of live checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.lock().len()
    }
}

/// Concurrency-safe map from session ID to transaction bookkeeping.
///
/// The map is lock-striped, so sessions on distinct handles never serialize
/// against each other. Operations on the *same* handle are expected to be
/// serialized by the caller; the registry only guarantees atomic map
/// mutation.
pub struct SessionRegistry<S> {
    sessions: DashMap<SessionId, SessionState<S>>,
}

impl<S> SessionRegistry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Atomic insert-if-absent. The supplier runs only when no bookkeeping
    /// exists for `id`; if it fails, no entry is created. Returns whether a
    /// new entry was inserted.
    pub fn get_or_create<F>(&self, id: SessionId, initial_auto_commit: F) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        match self.sessions.entry(id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(SessionState::new(initial_auto_commit()?));
                Ok(true)
            }
        }
    }

    /// Whether bookkeeping exists for `id`.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Runs `f` against the bookkeeping for `id`, if any. The registry's
    /// shard lock is held only for the duration of `f`.
    pub fn with_session<T, F>(&self, id: SessionId, f: F) -> Option<T>
    where
        F: FnOnce(&SessionState<S>) -> T,
    {
        self.sessions.get(&id).map(|state| f(&state))
    }

    /// Removes and returns the bookkeeping for `id`. Idempotent: a second
    /// remove is a no-op returning `None`.
    pub fn remove(&self, id: SessionId) -> Option<SessionState<S>> {
        self.sessions.remove(&id).map(|(_, state)| state)
    }

    /// Number of sessions with open transactions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session has an open transaction.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
