use serde::Deserialize;
use serde_json::Number;

use crate::errors::{AppError, Result};
use crate::services::mpesa_service::format_phone_number;

const MISSING_FIELDS: &str = "Missing required fields: phone_number and amount are required";
const DEFAULT_ACCOUNT_REFERENCE: &str = "Payment";
const DEFAULT_TRANSACTION_DESC: &str = "Payment for services";

/// Body of `POST /api/mpesa/stk-push`.
#[derive(Debug, Deserialize)]
pub struct StkPushRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub account_reference: Option<String>,
    #[serde(default)]
    pub transaction_desc: Option<String>,
}

/// Clients send the amount either as a JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(Number),
    Text(String),
}

impl AmountInput {
    /// Whole currency units; fractions are truncated.
    fn whole_units(&self) -> Option<i64> {
        let value = match self {
            AmountInput::Number(n) => match n.as_i64() {
                Some(units) => return Some(units),
                None => n.as_f64()?,
            },
            AmountInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };

        if value.is_finite() && value < i64::MAX as f64 {
            Some(value.trunc() as i64)
        } else {
            None
        }
    }
}

/// A validated push, ready to be sent to M-Pesa.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    pub phone_number: String,
    pub amount: i64,
    pub account_reference: String,
    pub transaction_desc: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl StkPushRequest {
    pub fn into_order(self, country_code: &str) -> Result<PaymentOrder> {
        let (phone_number, amount) = match (non_empty(self.phone_number), self.amount) {
            (Some(phone), Some(amount)) => (phone, amount),
            _ => return Err(AppError::invalid_data(MISSING_FIELDS)),
        };

        let amount = match amount.whole_units() {
            Some(units) if units > 0 => units,
            Some(_) => return Err(AppError::invalid_data("amount must be greater than 0")),
            None => return Err(AppError::invalid_data("amount must be a number")),
        };

        let phone_number = format_phone_number(&phone_number, country_code);
        if !phone_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::invalid_data(format!(
                "phone_number must contain only digits, got '{}'",
                phone_number
            )));
        }
        // A subscriber number must follow the country code.
        if phone_number.len() <= country_code.len() {
            return Err(AppError::invalid_data(format!(
                "phone_number is too short, got '{}'",
                phone_number
            )));
        }

        Ok(PaymentOrder {
            phone_number,
            amount,
            account_reference: non_empty(self.account_reference)
                .unwrap_or_else(|| DEFAULT_ACCOUNT_REFERENCE.to_string()),
            transaction_desc: non_empty(self.transaction_desc)
                .unwrap_or_else(|| DEFAULT_TRANSACTION_DESC.to_string()),
        })
    }
}
