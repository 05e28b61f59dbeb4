//! Domain records owned by the persistence layer.

use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, CurrencyCode, TransactionId};

/// A bank account. Immutable after creation in this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
    pub currency_code: CurrencyCode,
}

/// Attributes of an account to be opened. Name and email are assumed
/// pre-validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub currency_code: CurrencyCode,
}

/// An immutable signed monetary record attached to one account.
///
/// A transfer's credit leg carries `source_id`, the identifier of its paired
/// debit leg; a standalone credit entry never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: TransactionId,
    pub account_id: AccountId,
    /// Signed amount in minor units (two decimal places).
    pub amount_minor: i64,
    pub source_id: Option<TransactionId>,
}

/// A ledger entry to be written. The id is generated by the caller so a
/// paired entry can reference it before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub entry_id: TransactionId,
    pub account_id: AccountId,
    pub amount_minor: i64,
    pub source_id: Option<TransactionId>,
}
