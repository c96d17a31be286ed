// models/callback.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::transaction::TransactionStatus;

// Callback payload posted by M-Pesa to the CallBackURL
#[derive(Debug, Deserialize)]
pub struct MpesaCallback {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,

    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: Option<String>,

    #[serde(rename = "ResultCode")]
    pub result_code: i64,

    #[serde(rename = "ResultDesc")]
    pub result_desc: String,

    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,

    // M-Pesa omits Value for some items (e.g. Balance)
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl CallbackMetadata {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .and_then(|item| item.value.as_ref())
            .filter(|value| !value.is_null())
    }

    /// Numbers are rendered without quotes, so `TransactionDate: 20191219102115`
    /// becomes `"20191219102115"`.
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Terminal outcome carried by a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Success {
        mpesa_receipt_number: Option<String>,
        transaction_date: Option<String>,
        paid_amount: Option<f64>,
        paying_phone_number: Option<String>,
    },
    Failed {
        error_message: String,
    },
}

impl Settlement {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Settlement::Success { .. } => TransactionStatus::Success,
            Settlement::Failed { .. } => TransactionStatus::Failed,
        }
    }
}

/// A callback reduced to what reconciliation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackResult {
    pub merchant_request_id: String,
    pub checkout_request_id: Option<String>,
    pub result_code: i64,
    pub result_desc: String,
    pub settlement: Settlement,
}

impl From<StkCallback> for CallbackResult {
    fn from(callback: StkCallback) -> Self {
        let settlement = if callback.result_code == 0 {
            let metadata = callback.callback_metadata.as_ref();
            Settlement::Success {
                mpesa_receipt_number: metadata.and_then(|m| m.get_string("MpesaReceiptNumber")),
                transaction_date: metadata.and_then(|m| m.get_string("TransactionDate")),
                paid_amount: metadata.and_then(|m| m.get_f64("Amount")),
                paying_phone_number: metadata.and_then(|m| m.get_string("PhoneNumber")),
            }
        } else {
            Settlement::Failed {
                error_message: callback.result_desc.clone(),
            }
        };

        CallbackResult {
            merchant_request_id: callback.merchant_request_id,
            checkout_request_id: callback.checkout_request_id,
            result_code: callback.result_code,
            result_desc: callback.result_desc,
            settlement,
        }
    }
}

/// Acknowledgement M-Pesa expects back from the callback endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,

    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn echo(result: &CallbackResult) -> Self {
        CallbackAck {
            result_code: result.result_code,
            result_desc: result.result_desc.clone(),
        }
    }

    pub fn processing_failed() -> Self {
        CallbackAck {
            result_code: 1,
            result_desc: "Failed to process callback".to_string(),
        }
    }
}
