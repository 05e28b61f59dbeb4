//! Account and money-movement handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use minibank_core::{AccountId, CurrencyCode, Money};
use minibank_ledger::{LedgerService, NewAccount};
use minibank_ledger::store::{AccountStore, LedgerStore, StoreHealth};

use crate::app::{dto, errors};

pub async fn create_account<S>(
    Extension(service): Extension<Arc<LedgerService<S>>>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response
where
    S: AccountStore + LedgerStore + StoreHealth + 'static,
{
    if let Err(messages) = body.validate() {
        return errors::validation_error(messages);
    }

    let account = NewAccount {
        name: body.name,
        email: body.email,
        currency_code: CurrencyCode::new(body.currency_code),
    };

    match service.open_account(account).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(dto::AccountResponse::from(created)),
        )
            .into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

pub async fn add_money<S>(
    Extension(service): Extension<Arc<LedgerService<S>>>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddMoneyRequest>,
) -> axum::response::Response
where
    S: AccountStore + LedgerStore + StoreHealth + 'static,
{
    if let Err(messages) = body.validate() {
        return errors::validation_error(messages);
    }

    let account_id = match parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service
        .credit(account_id, Money::new(body.amount, CurrencyCode::eur()))
        .await
    {
        Ok(id) => (StatusCode::OK, Json(dto::TransactionResponse { id })).into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

pub async fn transfer_money<S>(
    Extension(service): Extension<Arc<LedgerService<S>>>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransferMoneyRequest>,
) -> axum::response::Response
where
    S: AccountStore + LedgerStore + StoreHealth + 'static,
{
    if let Err(messages) = body.validate() {
        return errors::validation_error(messages);
    }

    let account_id = match parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service
        .transfer(
            account_id,
            body.receiver_account_id,
            Money::new(body.amount, CurrencyCode::eur()),
        )
        .await
    {
        Ok(id) => (StatusCode::OK, Json(dto::TransactionResponse { id })).into_response(),
        Err(err) => errors::ledger_error_to_response(err),
    }
}

fn parse_account_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "account id must be a UUID",
        )
    })
}
