use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::{SettleOutcome, TransactionStore};
use crate::errors::{AppError, Result};
use crate::models::callback::CallbackResult;
use crate::models::transaction::MpesaTransaction;

/// Transaction store kept in process memory, keyed by merchant request id.
///
/// Records are lost on restart; meant for local runs and tests.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, MpesaTransaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn all(&self) -> Vec<MpesaTransaction> {
        let mut all: Vec<_> = self.transactions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.merchant_request_id.cmp(&b.merchant_request_id));
        all
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: MpesaTransaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.merchant_request_id) {
            return Err(AppError::DuplicateKey(tx.merchant_request_id));
        }
        transactions.insert(tx.merchant_request_id.clone(), tx);
        Ok(())
    }

    async fn find_by_merchant_request_id(&self, merchant_request_id: &str) -> Result<Option<MpesaTransaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(merchant_request_id).cloned())
    }

    async fn settle(&self, result: &CallbackResult) -> Result<SettleOutcome> {
        let mut transactions = self.transactions.write().await;
        let Some(tx) = transactions.get_mut(&result.merchant_request_id) else {
            return Ok(SettleOutcome::NotFound);
        };

        if tx.settle(result, Utc::now()) {
            Ok(SettleOutcome::Settled(tx.clone()))
        } else {
            Ok(SettleOutcome::AlreadySettled(tx.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::callback::Settlement;
    use crate::models::transaction::{NewMpesaTransaction, TransactionStatus};

    fn pending(merchant_request_id: &str) -> MpesaTransaction {
        MpesaTransaction::pending(NewMpesaTransaction {
            phone_number: "254712345678".to_string(),
            amount: 100,
            account_reference: "Payment".to_string(),
            transaction_desc: "Payment for services".to_string(),
            merchant_request_id: merchant_request_id.to_string(),
            checkout_request_id: format!("ws_CO_{}", merchant_request_id),
        })
    }

    fn success(merchant_request_id: &str) -> CallbackResult {
        CallbackResult {
            merchant_request_id: merchant_request_id.to_string(),
            checkout_request_id: None,
            result_code: 0,
            result_desc: "The service request is processed successfully.".to_string(),
            settlement: Settlement::Success {
                mpesa_receipt_number: Some("ABC123".to_string()),
                transaction_date: Some("20240101120000".to_string()),
                paid_amount: Some(100.0),
                paying_phone_number: Some("254712345678".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn settle_pending_record() {
        let store = InMemoryTransactionStore::new();
        store.insert(pending("m-1")).await.unwrap();

        let outcome = store.settle(&success("m-1")).await.unwrap();
        assert!(matches!(outcome, SettleOutcome::Settled(ref tx) if tx.status == TransactionStatus::Success));

        let tx = store.find_by_merchant_request_id("m-1").await.unwrap().unwrap();
        assert_eq!(tx.mpesa_receipt_number.as_deref(), Some("ABC123"));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_a_no_op() {
        let store = InMemoryTransactionStore::new();
        store.insert(pending("m-1")).await.unwrap();

        store.settle(&success("m-1")).await.unwrap();
        let after_first = store.find_by_merchant_request_id("m-1").await.unwrap().unwrap();

        let outcome = store.settle(&success("m-1")).await.unwrap();
        assert!(matches!(outcome, SettleOutcome::AlreadySettled(_)));

        let after_second = store.find_by_merchant_request_id("m-1").await.unwrap().unwrap();
        assert_eq!(after_first.updated_at, after_second.updated_at);
        assert_eq!(after_first.status, after_second.status);
        assert_eq!(after_first.mpesa_receipt_number, after_second.mpesa_receipt_number);
    }

    #[tokio::test]
    async fn unknown_id_leaves_store_unchanged() {
        let store = InMemoryTransactionStore::new();
        store.insert(pending("m-1")).await.unwrap();

        let outcome = store.settle(&success("m-404")).await.unwrap();
        assert!(matches!(outcome, SettleOutcome::NotFound));
        assert_eq!(store.len().await, 1);

        let tx = store.find_by_merchant_request_id("m-1").await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryTransactionStore::new();
        store.insert(pending("m-1")).await.unwrap();
        let err = store.insert(pending("m-1")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
    }
}
