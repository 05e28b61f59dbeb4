//! Per-account mutual exclusion.
//!
//! A transfer's balance-check-then-write sequence must never interleave with
//! another such sequence for the same source account. The registry hands out
//! one async lock per account identifier and reference-counts the holders:
//! an entry whose holder count returns to zero is removed from the table, so
//! the table only ever contains accounts with an operation in flight.
//!
//! The map itself is guarded by a single coarse `std::sync::Mutex`, distinct
//! from the per-account locks; it is only held for the map lookup, never
//! across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use minibank_core::AccountId;

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    holders: usize,
}

/// Registry of per-account locks with reference-counted eviction.
#[derive(Default)]
pub struct AccountLockRegistry {
    slots: Mutex<HashMap<AccountId, Slot>>,
}

impl AccountLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the calling task until it holds exclusive access for
    /// `account_id`. The lock is released when the returned guard drops,
    /// including when the caller is cancelled while waiting.
    pub async fn acquire(&self, account_id: AccountId) -> AccountLockGuard<'_> {
        let lock = {
            let mut slots = self.slots.lock().unwrap();
            let slot = slots.entry(account_id).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                holders: 0,
            });
            slot.holders += 1;
            Arc::clone(&slot.lock)
        };

        // Registered before the await: if the caller is cancelled while
        // waiting, dropping the reservation returns the holder slot.
        let reservation = Reservation {
            registry: self,
            account_id,
        };

        let inner = lock.lock_owned().await;

        AccountLockGuard {
            _inner: inner,
            _reservation: reservation,
        }
    }

    /// Number of accounts currently tracked by the registry.
    pub fn tracked_accounts(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    fn release(&self, account_id: AccountId) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(&account_id) {
            slot.holders -= 1;
            if slot.holders == 0 {
                slots.remove(&account_id);
            }
        }
    }
}

struct Reservation<'a> {
    registry: &'a AccountLockRegistry,
    account_id: AccountId,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.release(self.account_id);
    }
}

/// Exclusive access to one account. Fields drop in declaration order: the
/// async lock is released before the holder count is decremented, so a
/// waiter that already registered keeps the slot alive.
pub struct AccountLockGuard<'a> {
    _inner: OwnedMutexGuard<()>,
    _reservation: Reservation<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn entry_is_evicted_when_last_holder_releases() {
        let registry = AccountLockRegistry::new();
        let account = AccountId::new();

        let guard = registry.acquire(account).await;
        assert_eq!(registry.tracked_accounts(), 1);

        drop(guard);
        assert_eq!(registry.tracked_accounts(), 0);
    }

    #[tokio::test]
    async fn same_account_holders_are_serialized() {
        let registry = Arc::new(AccountLockRegistry::new());
        let account = AccountId::new();
        let in_section = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let in_section = Arc::clone(&in_section);
            tasks.push(tokio::spawn(async move {
                let _guard = registry.acquire(account).await;
                let concurrent = in_section.fetch_add(1, Ordering::SeqCst);
                assert_eq!(concurrent, 0, "two holders inside the critical section");
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.tracked_accounts(), 0);
    }

    #[tokio::test]
    async fn different_accounts_do_not_contend() {
        let registry = Arc::new(AccountLockRegistry::new());
        let a = AccountId::new();
        let b = AccountId::new();

        let _guard_a = registry.acquire(a).await;

        // Must complete without waiting on `a`'s lock.
        let registry_b = Arc::clone(&registry);
        let acquired = tokio::time::timeout(Duration::from_secs(1), async move {
            let _guard_b = registry_b.acquire(b).await;
        })
        .await;

        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn cancelled_waiter_returns_its_reservation() {
        let registry = Arc::new(AccountLockRegistry::new());
        let account = AccountId::new();

        let guard = registry.acquire(account).await;

        let registry_waiter = Arc::clone(&registry);
        let waiter = tokio::spawn(async move {
            let _guard = registry_waiter.acquire(account).await;
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        waiter.abort();
        let _ = waiter.await;

        drop(guard);
        assert_eq!(registry.tracked_accounts(), 0);
    }
}
