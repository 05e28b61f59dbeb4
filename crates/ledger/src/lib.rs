//! `minibank-ledger` — money-movement core.
//!
//! The [`service::LedgerService`] enforces the non-negative-balance invariant
//! and drives the storage layer's transactional unit; the [`locks`] module
//! serializes concurrent transfers that touch the same source account. The
//! service is written against the store traits in [`store`], with a Postgres
//! implementation living in `minibank-storage` and an in-memory one in
//! [`store::memory`].

pub mod account;
pub mod locks;
pub mod service;
pub mod store;

pub use account::{Account, LedgerEntry, NewAccount, NewEntry};
pub use locks::AccountLockRegistry;
pub use service::LedgerService;
pub use store::{AccountStore, LedgerStore, StoreError, StoreHealth};
