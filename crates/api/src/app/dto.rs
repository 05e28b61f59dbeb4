//! Request/response bodies and their validation.
//!
//! Amounts cross this boundary as minor-unit integers (two decimal places),
//! never as floating point. Unknown JSON fields are rejected.

use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, SUPPORTED_CURRENCY, TransactionId};
use minibank_ledger::Account;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub currency_code: String,
}

impl CreateAccountRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut messages = Vec::new();

        if self.name.len() < 3 || self.name.len() > 255 {
            messages.push("name must be between 3 and 255 characters".to_string());
        }
        if !is_plausible_email(&self.email) || self.email.len() > 255 {
            messages.push("email must be a valid address of at most 255 characters".to_string());
        }
        if self.currency_code != SUPPORTED_CURRENCY {
            messages.push(format!(
                "only {SUPPORTED_CURRENCY} currency code is currently supported"
            ));
        }

        if messages.is_empty() { Ok(()) } else { Err(messages) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddMoneyRequest {
    /// Positive amount in minor units.
    pub amount: i64,
}

impl AddMoneyRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        validate_amount(self.amount)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransferMoneyRequest {
    pub receiver_account_id: AccountId,
    /// Positive amount in minor units.
    pub amount: i64,
}

impl TransferMoneyRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        validate_amount(self.amount)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub currency_code: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.account_id,
            name: account.name,
            email: account.email,
            currency_code: account.currency_code.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
}

fn validate_amount(amount: i64) -> Result<(), Vec<String>> {
    if amount > 0 {
        Ok(())
    } else {
        Err(vec![
            "amount must be a positive minor-unit value".to_string(),
        ])
    }
}

/// Syntactic email check: one `@` with non-empty local and domain parts.
/// Deliverability is not this service's concern.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.starts_with('.') && domain.contains('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, currency: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            name: name.to_string(),
            email: email.to_string(),
            currency_code: currency.to_string(),
        }
    }

    #[test]
    fn accepts_a_well_formed_account_request() {
        assert!(request("Jane Holder", "jane@example.com", "EUR").validate().is_ok());
    }

    #[test]
    fn rejects_short_name_bad_email_and_foreign_currency() {
        let err = request("ab", "not-an-email", "USD").validate().unwrap_err();
        assert_eq!(err.len(), 3);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(AddMoneyRequest { amount: 0 }.validate().is_err());
        assert!(AddMoneyRequest { amount: -100 }.validate().is_err());
        assert!(AddMoneyRequest { amount: 1 }.validate().is_ok());
    }
}
