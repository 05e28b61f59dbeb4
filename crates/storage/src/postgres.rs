//! Postgres-backed account and ledger store.
//!
//! ## Error classification
//!
//! SQLx errors are classified into [`StoreError`] at this boundary:
//!
//! | PostgreSQL error code | StoreError             | Scenario                         |
//! |-----------------------|------------------------|----------------------------------|
//! | `23505`               | `DuplicateKey`         | Unique violation (account email) |
//! | `23503`               | `ReferentialIntegrity` | Insert against unknown account   |
//! | anything else         | `Other`                | Network, pool, protocol errors   |
//!
//! ## Atomicity
//!
//! [`LedgerStore::apply_entries`] wraps its inserts in one sqlx transaction:
//! the set commits as a whole or not at all. A transaction whose future is
//! dropped before commit (caller cancellation) rolls back.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use minibank_core::{AccountId, CurrencyCode, TransactionId};
use minibank_ledger::account::{Account, LedgerEntry, NewAccount, NewEntry};
use minibank_ledger::store::{AccountStore, LedgerStore, StoreError, StoreHealth};

/// Postgres-backed store. Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct PgBankStore {
    pool: PgPool,
}

impl PgBankStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema migrations bundled with this crate.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::other(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl AccountStore for PgBankStore {
    #[instrument(skip(self, account), err)]
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let account_id = AccountId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO account (account_id, email, name, currency_code)
            VALUES ($1, $2, $3, $4)
            RETURNING
                account_id, email, name, currency_code
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(&account.email)
        .bind(&account.name)
        .bind(account.currency_code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_account", e))?;

        row_to_account(&row)
    }

    #[instrument(skip(self), err)]
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                account_id, email, name, currency_code
            FROM account
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_account", e))?;

        row.map(|r| row_to_account(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn account_exists(&self, account_id: AccountId) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM account WHERE account_id = $1
            ) AS found
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("account_exists", e))?;

        row.try_get("found")
            .map_err(|e| StoreError::other(format!("failed to read existence flag: {e}")))
    }
}

#[async_trait]
impl LedgerStore for PgBankStore {
    #[instrument(skip(self, entry), err)]
    async fn insert_entry(&self, entry: NewEntry) -> Result<LedgerEntry, StoreError> {
        let row = insert_entry_query(&entry)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_entry", e))?;

        LedgerEntryRow::from_row(&row)
            .map(Into::into)
            .map_err(|e| StoreError::other(format!("failed to read ledger entry row: {e}")))
    }

    #[instrument(skip(self, entries), fields(entry_count = entries.len()), err)]
    async fn apply_entries(&self, entries: Vec<NewEntry>) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut tx: Transaction<'_, Postgres> = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut stored = Vec::with_capacity(entries.len());
        for entry in &entries {
            let row = insert_entry_query(entry)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("apply_entries", e))?;

            let entry = LedgerEntryRow::from_row(&row)
                .map(Into::into)
                .map_err(|e| StoreError::other(format!("failed to read ledger entry row: {e}")))?;
            stored.push(entry);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(stored)
    }

    #[instrument(skip(self), err)]
    async fn sum_entries(&self, account_id: AccountId) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                SUM(amount_minor)::bigint AS total
            FROM ledger_entry
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum_entries", e))?;

        // SUM over zero rows is NULL: "no entries yet", not zero.
        row.try_get("total")
            .map_err(|e| StoreError::other(format!("failed to read balance total: {e}")))
    }
}

#[async_trait]
impl StoreHealth for PgBankStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error("ping", e))
    }
}

fn insert_entry_query(
    entry: &NewEntry,
) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entry (entry_id, account_id, amount_minor, source_id)
        VALUES ($1, $2, $3, $4)
        RETURNING
            entry_id, account_id, amount_minor, source_id
        "#,
    )
    .bind(entry.entry_id.as_uuid())
    .bind(entry.account_id.as_uuid())
    .bind(entry.amount_minor)
    .bind(entry.source_id.map(uuid::Uuid::from))
}

fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
    AccountRow::from_row(row)
        .map(Into::into)
        .map_err(|e| StoreError::other(format!("failed to read account row: {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => StoreError::DuplicateKey,
            Some("23503") => StoreError::ReferentialIntegrity,
            _ => StoreError::other(format!(
                "database error in {operation}: {}",
                db_err.message()
            )),
        },
        sqlx::Error::PoolClosed => {
            StoreError::other(format!("connection pool closed in {operation}"))
        }
        other => StoreError::other(format!("sqlx error in {operation}: {other}")),
    }
}

#[derive(Debug)]
struct AccountRow {
    account_id: uuid::Uuid,
    email: String,
    name: String,
    currency_code: String,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            account_id: row.try_get("account_id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            currency_code: row.try_get("currency_code")?,
        })
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            account_id: AccountId::from_uuid(row.account_id),
            name: row.name,
            email: row.email,
            currency_code: CurrencyCode::new(row.currency_code),
        }
    }
}

#[derive(Debug)]
struct LedgerEntryRow {
    entry_id: uuid::Uuid,
    account_id: uuid::Uuid,
    amount_minor: i64,
    source_id: Option<uuid::Uuid>,
}

impl<'r> FromRow<'r, PgRow> for LedgerEntryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LedgerEntryRow {
            entry_id: row.try_get("entry_id")?,
            account_id: row.try_get("account_id")?,
            amount_minor: row.try_get("amount_minor")?,
            source_id: row.try_get("source_id")?,
        })
    }
}

impl From<LedgerEntryRow> for LedgerEntry {
    fn from(row: LedgerEntryRow) -> Self {
        LedgerEntry {
            entry_id: TransactionId::from_uuid(row.entry_id),
            account_id: AccountId::from_uuid(row.account_id),
            amount_minor: row.amount_minor,
            source_id: row.source_id.map(TransactionId::from_uuid),
        }
    }
}
