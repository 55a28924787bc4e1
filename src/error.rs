//! Transaction layer error types.

use thiserror::Error;

use crate::connection::IsolationLevel;

/// Boxed driver-level cause. The connection capability reports failures as
/// plain boxed errors; this layer wraps them with operation context.
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while demarcating a transaction.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("failed to start transaction")]
    BeginFailed(#[source] BoxDynError),

    #[error("failed to commit transaction")]
    CommitFailed(#[source] BoxDynError),

    #[error("failed to rollback transaction")]
    RollbackFailed(#[source] BoxDynError),

    #[error("failed to test for transaction status")]
    StatusQueryFailed(#[source] BoxDynError),

    #[error("unable to create checkpoint '{name}'")]
    CheckpointFailed {
        name: String,
        #[source]
        source: BoxDynError,
    },

    #[error("unable to release checkpoint '{name}'")]
    CheckpointReleaseFailed {
        name: String,
        #[source]
        source: BoxDynError,
    },

    #[error("unable to rollback to checkpoint '{name}'")]
    CheckpointRollbackFailed {
        name: String,
        #[source]
        source: BoxDynError,
    },

    /// The named checkpoint is unknown or was already consumed.
    #[error("no checkpoint named '{name}' in the current transaction")]
    CheckpointNotFound { name: String },

    /// A checkpoint operation was attempted on a session with no open
    /// transaction.
    #[error("checkpoint '{name}' requested outside of a transaction")]
    NotInTransaction { name: String },

    #[error("unable to set transaction isolation level to {level}")]
    IsolationFailed {
        level: IsolationLevel,
        #[source]
        source: BoxDynError,
    },

    /// Restoring the session's auto-commit state during teardown failed.
    #[error("unable to restore auto-commit state")]
    AutoCommitRestoreFailed(#[source] BoxDynError),

    /// The unit of work completed but was marked rollback-only.
    #[error("transaction failed due to rollback-only status")]
    RolledBack,

    /// A teardown step failed while a primary failure was already being
    /// reported. Both errors stay inspectable.
    #[error("{primary}")]
    Suppressed {
        #[source]
        primary: Box<TransactionError>,
        suppressed: Box<TransactionError>,
    },
}

impl TransactionError {
    /// Attaches a secondary failure, keeping `self` as the primary.
    pub fn with_suppressed(self, suppressed: TransactionError) -> Self {
        Self::Suppressed {
            primary: Box::new(self),
            suppressed: Box::new(suppressed),
        }
    }

    /// The primary failure, unwrapping any suppressed pairing.
    pub fn primary(&self) -> &TransactionError {
        match self {
            Self::Suppressed { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// The secondary failure attached during teardown, if any.
    pub fn suppressed(&self) -> Option<&TransactionError> {
        match self {
            Self::Suppressed { suppressed, .. } => Some(suppressed),
            _ => None,
        }
    }
}

/// Result type for transaction operations.
pub type Result<T> = std::result::Result<T, TransactionError>;

/// Errors from a callback-driven unit of work.
///
/// `E` is the caller's own error type; it is never swallowed or rewrapped
/// beyond this enum.
#[derive(Error, Debug)]
pub enum UnitOfWorkError<E> {
    /// The caller-supplied callback failed. If rolling back afterwards also
    /// failed, that failure is attached rather than replacing the original.
    #[error("transaction callback failed")]
    Callback {
        #[source]
        source: E,
        suppressed: Option<TransactionError>,
    },

    /// The transaction machinery itself failed, or the unit of work was
    /// marked rollback-only.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl<E> UnitOfWorkError<E> {
    /// Attaches a teardown failure to whichever variant is primary.
    pub(crate) fn with_suppressed(self, err: TransactionError) -> Self {
        match self {
            Self::Callback { source, suppressed } => Self::Callback {
                source,
                suppressed: Some(match suppressed {
                    Some(existing) => existing.with_suppressed(err),
                    None => err,
                }),
            },
            Self::Transaction(primary) => Self::Transaction(primary.with_suppressed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_err(msg: &str) -> BoxDynError {
        anyhow::anyhow!("{msg}").into()
    }

    #[test]
    fn test_display_messages() {
        let e = TransactionError::BeginFailed(driver_err("closed"));
        assert_eq!(format!("{}", e), "failed to start transaction");

        let e = TransactionError::CheckpointNotFound {
            name: "a".to_string(),
        };
        assert_eq!(
            format!("{}", e),
            "no checkpoint named 'a' in the current transaction"
        );

        let e = TransactionError::RolledBack;
        assert_eq!(
            format!("{}", e),
            "transaction failed due to rollback-only status"
        );
    }

    #[test]
    fn test_suppressed_pairing() {
        let primary = TransactionError::CommitFailed(driver_err("io"));
        let secondary = TransactionError::AutoCommitRestoreFailed(driver_err("io"));
        let paired = primary.with_suppressed(secondary);

        assert!(matches!(
            paired.primary(),
            TransactionError::CommitFailed(_)
        ));
        assert!(matches!(
            paired.suppressed(),
            Some(TransactionError::AutoCommitRestoreFailed(_))
        ));
        // Display follows the primary.
        assert_eq!(format!("{}", paired), "failed to commit transaction");
    }

    #[test]
    fn test_unit_of_work_suppression_chains_once() {
        #[derive(Debug, thiserror::Error)]
        #[error("app error")]
        struct AppError;

        let err: UnitOfWorkError<AppError> = UnitOfWorkError::Callback {
            source: AppError,
            suppressed: None,
        };
        let err = err.with_suppressed(TransactionError::RollbackFailed(driver_err("io")));
        match err {
            UnitOfWorkError::Callback { suppressed, .. } => {
                assert!(matches!(
                    suppressed,
                    Some(TransactionError::RollbackFailed(_))
                ));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_source_chain_reaches_driver_error() {
        use std::error::Error;

        let e = TransactionError::CheckpointFailed {
            name: "a".to_string(),
            source: driver_err("boom"),
        };
        let source = e.source().expect("driver cause");
        assert_eq!(format!("{}", source), "boom");
    }
}
