//! Local transaction demarcation over a single connection.
//!
//! The handler owns no connections; it drives whichever connection a
//! session handle carries, keeping per-session bookkeeping (captured
//! auto-commit mode, live checkpoints) in a shared registry for the
//! duration of each transaction.

use log::{debug, warn};

use crate::connection::{Connection, IsolationLevel};
use crate::error::{Result, TransactionError, UnitOfWorkError};
use crate::registry::SessionRegistry;
use crate::session::SessionHandle;
use crate::status::TransactionStatus;

/// Terminal states of a unit-of-work body.
enum Outcome<R, E> {
    /// The callback returned a value and did not request rollback.
    Completed(R),
    /// The callback returned normally but marked the transaction
    /// rollback-only; its value is discarded.
    RollbackOnly,
    /// The callback failed.
    Failed(E),
}

/// Transaction handler using local transactions demarcated explicitly on
/// the session's own connection.
///
/// Safe to share across sessions: bookkeeping is keyed by session ID in a
/// lock-striped registry. Operations on one particular session must be
/// serialized by the caller, since the underlying connection is single-user.
pub struct LocalTransactionHandler<C: Connection> {
    registry: SessionRegistry<C::Savepoint>,
}

impl<C: Connection> LocalTransactionHandler<C> {
    /// Creates a handler with no sessions in transaction.
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(),
        }
    }

    /// Starts a transaction on the session's connection.
    ///
    /// Captures the connection's auto-commit mode and switches it off.
    /// Idempotent: beginning on a session already in a transaction is a
    /// silent no-op and does not re-capture the mode. On failure no
    /// bookkeeping is recorded and the connection is left as found.
    pub fn begin(&self, handle: &SessionHandle<C>) -> Result<()> {
        let started = self.registry.get_or_create(handle.id(), || {
            let conn = handle.connection();
            let initial = conn.auto_commit().map_err(TransactionError::BeginFailed)?;
            conn.set_auto_commit(false)
                .map_err(TransactionError::BeginFailed)?;
            Ok(initial)
        })?;
        if started {
            debug!("{}: transaction started", handle.id());
        }
        Ok(())
    }

    /// Commits the session's transaction, then tears down bookkeeping and
    /// restores auto-commit mode whether or not the commit succeeded.
    pub fn commit(&self, handle: &SessionHandle<C>) -> Result<()> {
        let result = handle
            .connection()
            .commit()
            .map_err(TransactionError::CommitFailed);
        self.finish(handle, result, "committed")
    }

    /// Rolls back the session's transaction, then tears down bookkeeping
    /// and restores auto-commit mode whether or not the rollback succeeded.
    pub fn rollback(&self, handle: &SessionHandle<C>) -> Result<()> {
        let result = handle
            .connection()
            .rollback()
            .map_err(TransactionError::RollbackFailed);
        self.finish(handle, result, "rolled back")
    }

    /// Whether the session's connection currently has auto-commit off.
    /// Asks the connection directly; the registry is not consulted.
    pub fn is_in_transaction(&self, handle: &SessionHandle<C>) -> Result<bool> {
        let auto_commit = handle
            .connection()
            .auto_commit()
            .map_err(TransactionError::StatusQueryFailed)?;
        Ok(!auto_commit)
    }

    /// Creates a named checkpoint within the session's open transaction.
    pub fn checkpoint(&self, handle: &SessionHandle<C>, name: &str) -> Result<()> {
        if !self.registry.contains(handle.id()) {
            return Err(TransactionError::NotInTransaction {
                name: name.to_string(),
            });
        }
        let token = handle
            .connection()
            .set_savepoint(name)
            .map_err(|source| TransactionError::CheckpointFailed {
                name: name.to_string(),
                source,
            })?;
        self.registry
            .with_session(handle.id(), |state| state.add_checkpoint(name, token))
            .ok_or_else(|| TransactionError::NotInTransaction {
                name: name.to_string(),
            })?;
        debug!("{}: checkpoint '{}' created", handle.id(), name);
        Ok(())
    }

    /// Releases a checkpoint, keeping the work performed since it. The
    /// name is consumed and free for reuse.
    pub fn release(&self, handle: &SessionHandle<C>, name: &str) -> Result<()> {
        let token = self.take_checkpoint(handle, name)?;
        handle
            .connection()
            .release_savepoint(token)
            .map_err(|source| TransactionError::CheckpointReleaseFailed {
                name: name.to_string(),
                source,
            })?;
        debug!("{}: checkpoint '{}' released", handle.id(), name);
        Ok(())
    }

    /// Discards all work performed since the named checkpoint. The outer
    /// transaction stays open; the name is consumed and free for reuse.
    pub fn rollback_to_checkpoint(&self, handle: &SessionHandle<C>, name: &str) -> Result<()> {
        let token = self.take_checkpoint(handle, name)?;
        handle
            .connection()
            .rollback_to_savepoint(token)
            .map_err(|source| TransactionError::CheckpointRollbackFailed {
                name: name.to_string(),
                source,
            })?;
        debug!("{}: rolled back to checkpoint '{}'", handle.id(), name);
        Ok(())
    }

    /// Runs `body` inside a transaction on the session.
    ///
    /// A normal return commits and yields the body's value. Marking the
    /// status rollback-only discards the value, rolls back, and fails with
    /// [`TransactionError::RolledBack`]. A body error rolls back and stays
    /// the primary error; a rollback failure on that path is attached as
    /// suppressed, never replacing the original.
    pub fn run_in_transaction<R, E, F>(
        &self,
        handle: &SessionHandle<C>,
        body: F,
    ) -> std::result::Result<R, UnitOfWorkError<E>>
    where
        F: FnOnce(&SessionHandle<C>, &TransactionStatus) -> std::result::Result<R, E>,
    {
        self.begin(handle)?;
        let status = TransactionStatus::new();
        let outcome = match body(handle, &status) {
            Err(e) => Outcome::Failed(e),
            // An error takes precedence over the signal; only a normal
            // return consults it.
            Ok(_) if status.is_rollback_only() => Outcome::RollbackOnly,
            Ok(value) => Outcome::Completed(value),
        };
        match outcome {
            Outcome::Completed(value) => {
                self.commit(handle)?;
                Ok(value)
            }
            Outcome::RollbackOnly => {
                self.rollback(handle)?;
                Err(TransactionError::RolledBack.into())
            }
            Outcome::Failed(source) => {
                let suppressed = self.rollback(handle).err();
                if let Some(rollback_err) = &suppressed {
                    warn!(
                        "{}: rollback after callback failure also failed: {}",
                        handle.id(),
                        rollback_err
                    );
                }
                Err(UnitOfWorkError::Callback { source, suppressed })
            }
        }
    }

    /// Runs `body` inside a transaction at the requested isolation level,
    /// restoring the session's previous level afterwards, success or
    /// failure.
    pub fn run_in_transaction_isolated<R, E, F>(
        &self,
        handle: &SessionHandle<C>,
        level: IsolationLevel,
        body: F,
    ) -> std::result::Result<R, UnitOfWorkError<E>>
    where
        F: FnOnce(&SessionHandle<C>, &TransactionStatus) -> std::result::Result<R, E>,
    {
        let conn = handle.connection();
        let initial = conn
            .isolation()
            .map_err(|source| TransactionError::IsolationFailed { level, source })?;
        conn.set_isolation(level)
            .map_err(|source| TransactionError::IsolationFailed { level, source })?;

        let result = self.run_in_transaction(handle, body);
        let restore = conn.set_isolation(initial).map_err(|source| {
            TransactionError::IsolationFailed {
                level: initial,
                source,
            }
        });
        match (result, restore) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(restore_err)) => Err(restore_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!(
                    "{}: isolation level restore also failed: {}",
                    handle.id(),
                    restore_err
                );
                Err(e.with_suppressed(restore_err))
            }
        }
    }

    /// Number of sessions currently holding transaction bookkeeping.
    pub fn open_transactions(&self) -> usize {
        self.registry.len()
    }

    /// Commits or rolls back `result`'s operation, then restores session
    /// state. Teardown runs on every path; when both the operation and the
    /// teardown fail, the pair is reported together.
    fn finish(&self, handle: &SessionHandle<C>, result: Result<()>, what: &str) -> Result<()> {
        let restore = self.restore_auto_commit_state(handle);
        match (result, restore) {
            (Ok(()), Ok(())) => {
                debug!("{}: transaction {}", handle.id(), what);
                Ok(())
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(restore_err)) => Err(restore_err),
            (Err(e), Err(restore_err)) => {
                warn!("{}: teardown also failed: {}", handle.id(), restore_err);
                Err(e.with_suppressed(restore_err))
            }
        }
    }

    /// Removes the session's bookkeeping, then restores the captured
    /// auto-commit mode. Removal is unconditional; a session with no
    /// bookkeeping was already torn down and this is a no-op. Live
    /// checkpoints are discarded with the bookkeeping.
    fn restore_auto_commit_state(&self, handle: &SessionHandle<C>) -> Result<()> {
        let Some(state) = self.registry.remove(handle.id()) else {
            return Ok(());
        };
        handle
            .connection()
            .set_auto_commit(state.initial_auto_commit())
            .map_err(TransactionError::AutoCommitRestoreFailed)
    }

    fn take_checkpoint(&self, handle: &SessionHandle<C>, name: &str) -> Result<C::Savepoint> {
        self.registry
            .with_session(handle.id(), |state| state.take_checkpoint(name))
            .ok_or_else(|| TransactionError::NotInTransaction {
                name: name.to_string(),
            })?
            .ok_or_else(|| TransactionError::CheckpointNotFound {
                name: name.to_string(),
            })
    }
}

impl<C: Connection> Default for LocalTransactionHandler<C> {
    fn default() -> Self {
        Self::new()
    }
}
