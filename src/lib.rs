//! Local transaction demarcation over a single database connection.
//!
//! This crate owns the stateful part of talking to a driver connection:
//! - Transaction lifecycle (begin, commit, rollback) with auto-commit
//!   capture and restore
//! - Named checkpoints (savepoints) within an open transaction
//! - Callback-driven units of work with automatic commit/rollback and a
//!   rollback-only escape hatch
//! - Isolation-level scoping around a unit of work
//!
//! Statement building, parameter binding, and result mapping live in the
//! layers above; connections come from whatever resource manager the
//! application uses, exposed to this crate through the [`Connection`]
//! capability trait.

pub mod connection;
pub mod error;
pub mod handler;
pub mod registry;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use connection::{Connection, IsolationLevel};
pub use error::{BoxDynError, Result, TransactionError, UnitOfWorkError};
pub use handler::LocalTransactionHandler;
pub use registry::{SessionRegistry, SessionState};
pub use session::{SessionHandle, SessionId, SessionIdGenerator};
pub use status::TransactionStatus;
