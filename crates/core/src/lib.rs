//! `minibank-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, fixed-point money, and the domain error taxonomy.

pub mod error;
pub mod id;
pub mod money;

pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, TransactionId};
pub use money::{CurrencyCode, Money, MoneyError, SUPPORTED_CURRENCY};
