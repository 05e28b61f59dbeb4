//! Router construction and liveness/readiness probes.

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use minibank_ledger::LedgerService;
use minibank_ledger::store::{AccountStore, LedgerStore, StoreHealth};

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the HTTP router over a ledger service.
///
/// Generic over the backing store so the same router serves the Postgres
/// store in production and the in-memory store in tests and dev mode.
pub fn build_app<S>(service: Arc<LedgerService<S>>) -> Router
where
    S: AccountStore + LedgerStore + StoreHealth + 'static,
{
    Router::new()
        .route("/accounts", post(routes::create_account::<S>))
        .route("/accounts/:id/transactions", post(routes::add_money::<S>))
        .route(
            "/accounts/:id/transactions/transfer",
            post(routes::transfer_money::<S>),
        )
        .route("/healthz", get(health))
        .route("/readiness", get(readiness::<S>))
        .layer(Extension(service))
}

/// Accepting requests; says nothing about dependencies.
async fn health() -> &'static str {
    "OK"
}

/// Accepting requests and the backing store is responsive.
async fn readiness<S>(Extension(service): Extension<Arc<LedgerService<S>>>) -> Response
where
    S: AccountStore + LedgerStore + StoreHealth + 'static,
{
    match service.store().ping().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(err) => {
            tracing::error!(error = %err, "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
        }
    }
}
