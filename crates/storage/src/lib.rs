//! `minibank-storage` — Postgres implementation of the store contracts.

pub mod postgres;

pub use postgres::PgBankStore;
