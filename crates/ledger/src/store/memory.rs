//! In-memory store implementation.
//!
//! Used by tests and by the API's in-memory mode. Mirrors the Postgres
//! implementation's classification behavior: duplicate emails are
//! `DuplicateKey`, inserts against unknown accounts are
//! `ReferentialIntegrity`, and `apply_entries` validates every entry before
//! appending any so the batch is all-or-nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use minibank_core::AccountId;

use crate::account::{Account, LedgerEntry, NewAccount, NewEntry};
use crate::store::{AccountStore, LedgerStore, StoreError, StoreHealth};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
}

/// Shared in-memory account + ledger store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBankStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryBankStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ledger entries across all accounts.
    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// All entries for one account, in insertion order.
    pub fn entries_for(&self, account_id: AccountId) -> Vec<LedgerEntry> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AccountStore for InMemoryBankStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut state = self.state.lock().unwrap();

        if state.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateKey);
        }

        let created = Account {
            account_id: AccountId::new(),
            name: account.name,
            email: account.email,
            currency_code: account.currency_code,
        };
        state.accounts.insert(created.account_id, created.clone());

        Ok(created)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.lock().unwrap().accounts.get(&account_id).cloned())
    }

    async fn account_exists(&self, account_id: AccountId) -> Result<bool, StoreError> {
        Ok(self.state.lock().unwrap().accounts.contains_key(&account_id))
    }
}

#[async_trait]
impl LedgerStore for InMemoryBankStore {
    async fn insert_entry(&self, entry: NewEntry) -> Result<LedgerEntry, StoreError> {
        let mut state = self.state.lock().unwrap();
        insert_one(&mut state, entry)
    }

    async fn apply_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut state = self.state.lock().unwrap();

        // Referential check up front; nothing is appended unless every entry
        // passes.
        for entry in &entries {
            if !state.accounts.contains_key(&entry.account_id) {
                return Err(StoreError::ReferentialIntegrity);
            }
        }

        entries.into_iter().map(|e| insert_one(&mut state, e)).collect()
    }

    async fn sum_entries(&self, account_id: AccountId) -> Result<Option<i64>, StoreError> {
        let state = self.state.lock().unwrap();

        let mut total: Option<i64> = None;
        for entry in state.entries.iter().filter(|e| e.account_id == account_id) {
            total = Some(total.unwrap_or(0) + entry.amount_minor);
        }

        Ok(total)
    }
}

#[async_trait]
impl StoreHealth for InMemoryBankStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn insert_one(state: &mut State, entry: NewEntry) -> Result<LedgerEntry, StoreError> {
    if !state.accounts.contains_key(&entry.account_id) {
        return Err(StoreError::ReferentialIntegrity);
    }

    let stored = LedgerEntry {
        entry_id: entry.entry_id,
        account_id: entry.account_id,
        amount_minor: entry.amount_minor,
        source_id: entry.source_id,
    };
    state.entries.push(stored.clone());

    Ok(stored)
}
