//! `minibank-api` — HTTP surface over the ledger service.

pub mod app;
