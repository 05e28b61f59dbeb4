//! Store contracts the ledger service is written against.
//!
//! Storage failures are classified here, at the boundary: uniqueness and
//! referential violations get their own variants so the service can translate
//! them into domain errors; everything else degrades to [`StoreError::Other`].

use async_trait::async_trait;
use thiserror::Error;

use minibank_core::AccountId;

use crate::account::{Account, LedgerEntry, NewAccount, NewEntry};

pub mod memory;

/// Classified storage failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint was violated (e.g. duplicate email).
    #[error("duplicate key")]
    DuplicateKey,

    /// A referenced row does not exist (e.g. unknown account on insert).
    #[error("referential integrity violation")]
    ReferentialIntegrity,

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn account_exists(&self, account_id: AccountId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a single entry. Atomic on its own; no surrounding unit needed.
    async fn insert_entry(&self, entry: NewEntry) -> Result<LedgerEntry, StoreError>;

    /// Persist an ordered set of entries as one atomic unit: either every
    /// entry becomes visible or none does. Partial application is
    /// structurally impossible.
    async fn apply_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Derived balance: the sum of all entries for an account, in minor
    /// units. `None` means the account has no entries yet, which is distinct
    /// from a computed zero.
    async fn sum_entries(&self, account_id: AccountId) -> Result<Option<i64>, StoreError>;
}

/// Liveness of the backing store, consumed by the readiness probe.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}
