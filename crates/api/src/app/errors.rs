//! Domain-error to HTTP-response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use minibank_core::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::AccountNotFound => {
            json_error(StatusCode::NOT_FOUND, "account_not_found", err.to_string())
        }
        LedgerError::RecipientAccountNotFound => json_error(
            StatusCode::NOT_FOUND,
            "receiver_account_not_found",
            err.to_string(),
        ),
        LedgerError::InsufficientBalance => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_balance",
            err.to_string(),
        ),
        LedgerError::AlreadyExists => {
            json_error(StatusCode::CONFLICT, "already_exists", err.to_string())
        }
        // Opaque by design; the cause was logged where it was classified.
        LedgerError::Internal => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        ),
    }
}

pub fn validation_error(messages: Vec<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "validation_error",
            "messages": messages,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
