//! The ledger service: open account, credit, transfer.

use tracing::instrument;

use minibank_core::{AccountId, LedgerError, LedgerResult, Money, TransactionId};

use crate::account::{Account, NewAccount, NewEntry};
use crate::locks::AccountLockRegistry;
use crate::store::{AccountStore, LedgerStore, StoreError};

/// Money-movement operations over a backing store.
///
/// Cancellation safety: every operation may be dropped at any await point.
/// An in-flight storage transaction rolls back when its future is dropped and
/// the per-account lock guard releases on drop, so no partial entry pair is
/// ever visible.
pub struct LedgerService<S> {
    store: S,
    locks: AccountLockRegistry,
}

impl<S> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: AccountLockRegistry::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &AccountLockRegistry {
        &self.locks
    }
}

impl<S> LedgerService<S>
where
    S: AccountStore + LedgerStore,
{
    /// Open a bank account.
    ///
    /// Name, email and currency code are assumed pre-validated by the caller.
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn open_account(&self, account: NewAccount) -> LedgerResult<Account> {
        match self.store.create_account(account).await {
            Ok(created) => Ok(created),
            Err(StoreError::DuplicateKey) => Err(LedgerError::AlreadyExists),
            Err(err) => {
                tracing::error!(error = %err, "failed to create account");
                Err(LedgerError::Internal)
            }
        }
    }

    /// Credit an account with a positive amount (pre-validated by the
    /// caller).
    ///
    /// Writes exactly one entry with no back-reference. No locking: a single
    /// insert is already atomic at the storage layer, and a concurrent credit
    /// can only increase available balance.
    #[instrument(skip(self, amount), fields(%account_id))]
    pub async fn credit(&self, account_id: AccountId, amount: Money) -> LedgerResult<TransactionId> {
        if !self.account_exists(account_id).await? {
            return Err(LedgerError::AccountNotFound);
        }

        let entry = NewEntry {
            entry_id: TransactionId::new(),
            account_id,
            amount_minor: amount.minor(),
            source_id: None,
        };

        match self.store.insert_entry(entry).await {
            Ok(stored) => Ok(stored.entry_id),
            Err(err) => {
                tracing::error!(error = %err, "failed to insert credit entry");
                Err(LedgerError::Internal)
            }
        }
    }

    /// Transfer `amount` from `source_id` to `receiver_id`.
    ///
    /// The source's derived balance is read inside the per-account critical
    /// section, so two concurrent transfers from the same account can never
    /// both pass the sufficiency check against a pre-debit balance. The debit
    /// and credit legs are applied as one atomic set; the credit leg's id is
    /// returned as the transfer's transaction identifier.
    #[instrument(skip(self, amount), fields(%source_id, %receiver_id))]
    pub async fn transfer(
        &self,
        source_id: AccountId,
        receiver_id: AccountId,
        amount: Money,
    ) -> LedgerResult<TransactionId> {
        let source = match self.store.get_account(source_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return Err(LedgerError::AccountNotFound),
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch account");
                return Err(LedgerError::Internal);
            }
        };

        // Held until return; released on every exit path, including drop.
        let _guard = self.locks.acquire(source_id).await;

        let total = self.store.sum_entries(source_id).await.map_err(|err| {
            tracing::error!(error = %err, "failed to sum account entries");
            LedgerError::Internal
        })?;

        ensure_sufficient_balance(total, &source, &amount)?;

        let debit_id = TransactionId::new();
        let credit_id = TransactionId::new();
        let legs = vec![
            NewEntry {
                entry_id: debit_id,
                account_id: source_id,
                amount_minor: -amount.minor(),
                source_id: None,
            },
            NewEntry {
                entry_id: credit_id,
                account_id: receiver_id,
                amount_minor: amount.minor(),
                source_id: Some(debit_id),
            },
        ];

        match self.store.apply_entries(legs).await {
            Ok(_) => Ok(credit_id),
            Err(StoreError::ReferentialIntegrity) => Err(LedgerError::RecipientAccountNotFound),
            Err(err) => {
                tracing::error!(error = %err, "failed to apply transfer entries");
                Err(LedgerError::Internal)
            }
        }
    }

    async fn account_exists(&self, account_id: AccountId) -> LedgerResult<bool> {
        self.store.account_exists(account_id).await.map_err(|err| {
            tracing::error!(error = %err, "failed to check account existence");
            LedgerError::Internal
        })
    }
}

/// The remaining balance after the transfer must be strictly positive: an
/// account with no entries has no funds to move, and transferring the entire
/// balance is rejected.
fn ensure_sufficient_balance(
    total_minor: Option<i64>,
    source: &Account,
    amount: &Money,
) -> LedgerResult<()> {
    let Some(total_minor) = total_minor else {
        return Err(LedgerError::InsufficientBalance);
    };

    let balance = Money::new(total_minor, source.currency_code.clone());
    let remaining = balance.checked_sub(amount).map_err(|err| {
        // A mismatch here means the stored account currency disagrees with
        // the request; never coerce, never write.
        tracing::error!(error = %err, "balance arithmetic failed");
        LedgerError::Internal
    })?;

    if !remaining.is_positive() {
        return Err(LedgerError::InsufficientBalance);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use proptest::prelude::*;

    use minibank_core::CurrencyCode;

    use crate::store::memory::InMemoryBankStore;

    fn eur(minor: i64) -> Money {
        Money::new(minor, CurrencyCode::eur())
    }

    fn service() -> LedgerService<InMemoryBankStore> {
        LedgerService::new(InMemoryBankStore::new())
    }

    async fn open(service: &LedgerService<InMemoryBankStore>, email: &str) -> Account {
        service
            .open_account(NewAccount {
                name: "Test Holder".to_string(),
                email: email.to_string(),
                currency_code: CurrencyCode::eur(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_account_maps_duplicate_key() {
        let service = service();
        open(&service, "a@example.com").await;

        let err = service
            .open_account(NewAccount {
                name: "Other Holder".to_string(),
                email: "a@example.com".to_string(),
                currency_code: CurrencyCode::eur(),
            })
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::AlreadyExists);
    }

    #[tokio::test]
    async fn credit_adds_one_entry_without_back_reference() {
        let service = service();
        let account = open(&service, "a@example.com").await;

        let id = service.credit(account.account_id, eur(2_500)).await.unwrap();

        let entries = service.store().entries_for(account.account_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_id, id);
        assert_eq!(entries[0].amount_minor, 2_500);
        assert_eq!(entries[0].source_id, None);
        assert_eq!(
            service.store().sum_entries(account.account_id).await.unwrap(),
            Some(2_500)
        );
    }

    #[tokio::test]
    async fn credit_unknown_account_fails() {
        let service = service();

        let err = service.credit(AccountId::new(), eur(100)).await.unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound);
        assert_eq!(service.store().entry_count(), 0);
    }

    #[tokio::test]
    async fn transfer_writes_a_linked_debit_credit_pair() {
        let service = service();
        let a = open(&service, "a@example.com").await;
        let b = open(&service, "b@example.com").await;
        service.credit(a.account_id, eur(11_100)).await.unwrap();

        let credit_id = service
            .transfer(a.account_id, b.account_id, eur(10_000))
            .await
            .unwrap();

        let debits = service.store().entries_for(a.account_id);
        let credits = service.store().entries_for(b.account_id);
        assert_eq!(debits.len(), 2); // initial credit + debit leg
        assert_eq!(credits.len(), 1);

        let debit = &debits[1];
        let credit = &credits[0];
        assert_eq!(debit.amount_minor, -10_000);
        assert_eq!(credit.amount_minor, 10_000);
        assert_eq!(credit.entry_id, credit_id);
        assert_eq!(credit.source_id, Some(debit.entry_id));
        assert_eq!(debit.source_id, None);

        assert_eq!(
            service.store().sum_entries(a.account_id).await.unwrap(),
            Some(1_100)
        );
        assert_eq!(
            service.store().sum_entries(b.account_id).await.unwrap(),
            Some(10_000)
        );
    }

    #[tokio::test]
    async fn transfer_from_unknown_account_fails() {
        let service = service();
        let b = open(&service, "b@example.com").await;

        let err = service
            .transfer(AccountId::new(), b.account_id, eur(100))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound);
    }

    #[tokio::test]
    async fn transfer_from_empty_account_is_insufficient() {
        let service = service();
        let a = open(&service, "a@example.com").await;
        let b = open(&service, "b@example.com").await;

        let err = service
            .transfer(a.account_id, b.account_id, eur(1))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance);
        assert_eq!(service.store().entry_count(), 0);
    }

    #[tokio::test]
    async fn transfer_of_entire_balance_is_insufficient() {
        let service = service();
        let a = open(&service, "a@example.com").await;
        let b = open(&service, "b@example.com").await;
        service.credit(a.account_id, eur(500)).await.unwrap();

        let err = service
            .transfer(a.account_id, b.account_id, eur(500))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance);
        assert_eq!(service.store().entry_count(), 1);
    }

    #[tokio::test]
    async fn transfer_to_unknown_receiver_leaves_ledger_untouched() {
        let service = service();
        let a = open(&service, "a@example.com").await;
        service.credit(a.account_id, eur(1_000)).await.unwrap();

        let err = service
            .transfer(a.account_id, AccountId::new(), eur(100))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::RecipientAccountNotFound);
        assert_eq!(service.store().entry_count(), 1);
        assert_eq!(
            service.store().sum_entries(a.account_id).await.unwrap(),
            Some(1_000)
        );
    }

    #[tokio::test]
    async fn lock_table_is_empty_after_transfers() {
        let service = service();
        let a = open(&service, "a@example.com").await;
        let b = open(&service, "b@example.com").await;
        service.credit(a.account_id, eur(1_000)).await.unwrap();

        service
            .transfer(a.account_id, b.account_id, eur(100))
            .await
            .unwrap();

        assert_eq!(service.locks().tracked_accounts(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn oversubscribed_concurrent_transfers_never_go_negative() {
        let service = Arc::new(service());
        let a = open(&service, "a@example.com").await;
        let b = open(&service, "b@example.com").await;
        service.credit(a.account_id, eur(1_000)).await.unwrap();

        // 10 transfers of 300 against a balance of 1000: at most three can
        // pass the strictly-positive sufficiency check.
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let service = Arc::clone(&service);
            let (source, receiver) = (a.account_id, b.account_id);
            tasks.push(tokio::spawn(async move {
                service.transfer(source, receiver, eur(300)).await
            }));
        }

        let mut succeeded = 0;
        let mut insufficient = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(LedgerError::InsufficientBalance) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert!(succeeded <= 3);
        assert!(insufficient >= 7);

        let balance = service
            .store()
            .sum_entries(a.account_id)
            .await
            .unwrap()
            .unwrap();
        assert!(balance >= 0, "balance went negative: {balance}");
        assert_eq!(balance, 1_000 - 300 * succeeded);
        assert_eq!(service.locks().tracked_accounts(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: any interleaving of credits and transfer attempts
        /// conserves the total across both accounts and never drives either
        /// derived balance negative.
        #[test]
        fn credits_and_transfers_conserve_funds(
            ops in prop::collection::vec((prop::bool::ANY, 1i64..5_000i64), 1..40)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            rt.block_on(async {
                let service = service();
                let a = open(&service, "a@example.com").await;
                let b = open(&service, "b@example.com").await;

                let mut credited: i64 = 0;
                for (is_credit, amount) in ops {
                    if is_credit {
                        service.credit(a.account_id, eur(amount)).await.unwrap();
                        credited += amount;
                    } else {
                        // May fail with InsufficientBalance; that is a valid
                        // terminal outcome and must leave the ledger as-is.
                        let _ = service.transfer(a.account_id, b.account_id, eur(amount)).await;
                    }
                }

                let balance_a = service.store().sum_entries(a.account_id).await.unwrap().unwrap_or(0);
                let balance_b = service.store().sum_entries(b.account_id).await.unwrap().unwrap_or(0);

                prop_assert!(balance_a >= 0);
                prop_assert!(balance_b >= 0);
                prop_assert_eq!(balance_a + balance_b, credited);
                Ok(())
            })?;
        }
    }
}
