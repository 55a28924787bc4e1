//! Session identity and the handle binding a session to its connection.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::connection::Connection;

/// A unique identifier for a logical session.
///
/// Used as the lookup key for per-session transaction bookkeeping; the
/// identity is stable for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Creates a new session ID with the given value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the inner u64 value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session{}", self.0)
    }
}

/// A thread-safe session ID generator.
pub struct SessionIdGenerator {
    next_id: AtomicU64,
}

impl SessionIdGenerator {
    /// Creates a new generator starting from 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Generates the next unique session ID.
    pub fn next(&self) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        SessionId::new(id)
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A session handle: one logical unit of work bound to exactly one
/// connection for the duration of its transactions.
///
/// Handles are created by the surrounding resource manager (whatever opens
/// connections) and passed into the transaction handler, which uses the
/// `SessionId` only as a bookkeeping key.
pub struct SessionHandle<C> {
    id: SessionId,
    conn: C,
}

impl<C: Connection> SessionHandle<C> {
    /// Binds a connection to a session identity.
    pub fn new(id: SessionId, conn: C) -> Self {
        Self { id, conn }
    }

    /// The session's identity.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Consumes the handle, returning the connection to the resource
    /// manager.
    pub fn into_connection(self) -> C {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_new() {
        let id = SessionId::new(42);
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new(123);
        assert_eq!(format!("{}", id), "Session123");
    }

    #[test]
    fn test_session_id_comparison() {
        let id1 = SessionId::new(1);
        let id2 = SessionId::new(2);
        let id3 = SessionId::new(1);

        assert!(id1 < id2);
        assert!(id1 == id3);
    }

    #[test]
    fn test_session_id_generator() {
        let generator = SessionIdGenerator::new();

        assert_eq!(generator.next().value(), 1);
        assert_eq!(generator.next().value(), 2);
        assert_eq!(generator.next().value(), 3);
    }

    #[test]
    fn test_session_id_generator_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let generator = Arc::new(SessionIdGenerator::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let gen = Arc::clone(&generator);
            handles.push(thread::spawn(move || {
                (0..100).map(|_| gen.next()).collect::<Vec<_>>()
            }));
        }

        let mut all_ids = vec![];
        for handle in handles {
            all_ids.extend(handle.join().unwrap());
        }

        let mut unique_ids: Vec<_> = all_ids.iter().map(|id| id.value()).collect();
        unique_ids.sort();
        unique_ids.dedup();

        assert_eq!(all_ids.len(), 1000);
        assert_eq!(unique_ids.len(), 1000);
    }
}
