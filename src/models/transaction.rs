// models/transaction.rs
use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::models::callback::{CallbackResult, Settlement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// One STK push, from acceptance by the provider to its final callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaTransaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub phone_number: String,
    pub amount: i64,
    pub account_reference: String,
    pub transaction_desc: String,

    // M-Pesa correlation ids
    pub merchant_request_id: String,
    pub checkout_request_id: String,

    pub status: TransactionStatus,

    // Set by the callback
    #[serde(default)]
    pub result_code: Option<i64>,
    #[serde(default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub mpesa_receipt_number: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub paying_phone_number: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Fields of a freshly accepted push.
#[derive(Debug, Clone)]
pub struct NewMpesaTransaction {
    pub phone_number: String,
    pub amount: i64,
    pub account_reference: String,
    pub transaction_desc: String,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
}

impl MpesaTransaction {
    pub fn pending(new: NewMpesaTransaction) -> Self {
        let now = Utc::now();
        MpesaTransaction {
            id: Some(ObjectId::new()),
            phone_number: new.phone_number,
            amount: new.amount,
            account_reference: new.account_reference,
            transaction_desc: new.transaction_desc,
            merchant_request_id: new.merchant_request_id,
            checkout_request_id: new.checkout_request_id,
            status: TransactionStatus::Pending,
            result_code: None,
            result_desc: None,
            mpesa_receipt_number: None,
            transaction_date: None,
            paid_amount: None,
            paying_phone_number: None,
            error_message: None,
            timestamp: now,
            updated_at: now,
        }
    }

    /// Moves a pending record to its terminal state. Returns `false` and
    /// leaves the record untouched if it is already terminal.
    pub fn settle(&mut self, result: &CallbackResult, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = result.settlement.status();
        self.result_code = Some(result.result_code);
        self.result_desc = Some(result.result_desc.clone());
        match &result.settlement {
            Settlement::Success {
                mpesa_receipt_number,
                transaction_date,
                paid_amount,
                paying_phone_number,
            } => {
                self.mpesa_receipt_number = mpesa_receipt_number.clone();
                self.transaction_date = transaction_date.clone();
                self.paid_amount = *paid_amount;
                self.paying_phone_number = paying_phone_number.clone();
            }
            Settlement::Failed { error_message } => {
                self.error_message = Some(error_message.clone());
            }
        }
        self.updated_at = now;
        true
    }
}

/// JSON view returned by the status endpoint.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub phone_number: String,
    pub amount: i64,
    pub account_reference: String,
    pub transaction_desc: String,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub status: TransactionStatus,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub mpesa_receipt_number: Option<String>,
    pub transaction_date: Option<String>,
    pub paid_amount: Option<f64>,
    pub paying_phone_number: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MpesaTransaction> for TransactionView {
    fn from(tx: MpesaTransaction) -> Self {
        TransactionView {
            phone_number: tx.phone_number,
            amount: tx.amount,
            account_reference: tx.account_reference,
            transaction_desc: tx.transaction_desc,
            merchant_request_id: tx.merchant_request_id,
            checkout_request_id: tx.checkout_request_id,
            status: tx.status,
            result_code: tx.result_code,
            result_desc: tx.result_desc,
            mpesa_receipt_number: tx.mpesa_receipt_number,
            transaction_date: tx.transaction_date,
            paid_amount: tx.paid_amount,
            paying_phone_number: tx.paying_phone_number,
            error_message: tx.error_message,
            timestamp: tx.timestamp,
            updated_at: tx.updated_at,
        }
    }
}
