//! Connection capability consumed by the transaction handler.
//!
//! The handler drives a single physical database connection through this
//! trait: auto-commit toggling, commit/rollback, savepoints, and isolation
//! levels. The connection is not reentrant; callers must not use one
//! instance from two execution contexts at the same time.

use serde::{Deserialize, Serialize};

use crate::error::BoxDynError;

/// Transaction isolation levels, with JDBC-compatible numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Transactions are not supported.
    None,
    /// Dirty reads, non-repeatable reads and phantom reads can occur.
    ReadUncommitted,
    /// Each query sees only data committed before the query began.
    ReadCommitted,
    /// All queries in a transaction see the same snapshot of committed data.
    RepeatableRead,
    /// Transactions appear to execute serially.
    Serializable,
}

impl IsolationLevel {
    /// The numeric code drivers expect.
    pub fn value(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::ReadUncommitted => 1,
            Self::ReadCommitted => 2,
            Self::RepeatableRead => 4,
            Self::Serializable => 8,
        }
    }

    /// Looks up the level for a driver-reported numeric code.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::ReadUncommitted),
            2 => Some(Self::ReadCommitted),
            4 => Some(Self::RepeatableRead),
            8 => Some(Self::Serializable),
            _ => None,
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::ReadUncommitted => write!(f, "READ_UNCOMMITTED"),
            Self::ReadCommitted => write!(f, "READ_COMMITTED"),
            Self::RepeatableRead => write!(f, "REPEATABLE_READ"),
            Self::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Capability contract of the underlying driver connection.
///
/// Methods take `&self`; implementors provide interior mutability. Every
/// call may fail at the resource level, reported as a boxed driver error
/// which the handler wraps with operation context.
pub trait Connection {
    /// Opaque token identifying a savepoint within an open transaction.
    type Savepoint;

    /// Current auto-commit mode of the connection.
    fn auto_commit(&self) -> std::result::Result<bool, BoxDynError>;

    /// Switches auto-commit mode on or off.
    fn set_auto_commit(&self, on: bool) -> std::result::Result<(), BoxDynError>;

    /// Commits the open transaction.
    fn commit(&self) -> std::result::Result<(), BoxDynError>;

    /// Rolls back the open transaction.
    fn rollback(&self) -> std::result::Result<(), BoxDynError>;

    /// Creates a named savepoint within the open transaction.
    fn set_savepoint(&self, name: &str) -> std::result::Result<Self::Savepoint, BoxDynError>;

    /// Releases a savepoint without discarding work.
    fn release_savepoint(&self, savepoint: Self::Savepoint)
        -> std::result::Result<(), BoxDynError>;

    /// Discards all work performed since the savepoint.
    fn rollback_to_savepoint(
        &self,
        savepoint: Self::Savepoint,
    ) -> std::result::Result<(), BoxDynError>;

    /// Current transaction isolation level.
    fn isolation(&self) -> std::result::Result<IsolationLevel, BoxDynError>;

    /// Changes the transaction isolation level.
    fn set_isolation(&self, level: IsolationLevel) -> std::result::Result<(), BoxDynError>;
}
