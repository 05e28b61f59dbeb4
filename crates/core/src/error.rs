//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger domain.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors produced by ledger operations.
///
/// The first four variants are caller-actionable and safe to render to a
/// client. `Internal` is deliberately opaque: the underlying cause is logged
/// where the failure is classified and never leaks to the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The account addressed by the operation does not exist.
    #[error("account not found")]
    AccountNotFound,

    /// The receiving side of a transfer does not exist.
    #[error("receiver account not found")]
    RecipientAccountNotFound,

    /// The source account's derived balance cannot cover the transfer.
    #[error("insufficient account balance")]
    InsufficientBalance,

    /// An account with the same unique key (email) already exists.
    #[error("account already exists")]
    AlreadyExists,

    /// An unclassified storage or arithmetic failure.
    #[error("internal error")]
    Internal,
}
