use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use tracing::info;

use crate::database::{SettleOutcome, TransactionStore};
use crate::errors::{AppError, Result};
use crate::models::callback::{CallbackResult, Settlement};
use crate::models::transaction::{MpesaTransaction, TransactionStatus};

const COLLECTION: &str = "transactions";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoTransactionStore {
    collection: Collection<MpesaTransaction>,
}

impl MongoTransactionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }

    /// One record per merchant request id.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "merchant_request_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection.create_index(index).await?;
        info!("Index on {}.merchant_request_id ready", COLLECTION);
        Ok(())
    }
}

fn settlement_fields(result: &CallbackResult, now: DateTime<Utc>) -> Document {
    let mut fields = doc! {
        "status": result.settlement.status().as_str(),
        "result_code": result.result_code,
        "result_desc": result.result_desc.as_str(),
        "updated_at": bson::DateTime::from_chrono(now),
    };

    match &result.settlement {
        Settlement::Success {
            mpesa_receipt_number,
            transaction_date,
            paid_amount,
            paying_phone_number,
        } => {
            fields.insert("mpesa_receipt_number", mpesa_receipt_number.clone());
            fields.insert("transaction_date", transaction_date.clone());
            fields.insert("paid_amount", *paid_amount);
            fields.insert("paying_phone_number", paying_phone_number.clone());
        }
        Settlement::Failed { error_message } => {
            fields.insert("error_message", error_message.as_str());
        }
    }

    fields
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn insert_error(err: mongodb::error::Error, merchant_request_id: &str) -> AppError {
    if is_duplicate_key(&err) {
        AppError::DuplicateKey(merchant_request_id.to_string())
    } else {
        AppError::MongoDB(err)
    }
}

#[async_trait]
impl TransactionStore for MongoTransactionStore {
    async fn insert(&self, tx: MpesaTransaction) -> Result<()> {
        self.collection
            .insert_one(&tx)
            .await
            .map_err(|e| insert_error(e, &tx.merchant_request_id))?;
        Ok(())
    }

    async fn find_by_merchant_request_id(&self, merchant_request_id: &str) -> Result<Option<MpesaTransaction>> {
        let tx = self
            .collection
            .find_one(doc! { "merchant_request_id": merchant_request_id })
            .await?;
        Ok(tx)
    }

    async fn settle(&self, result: &CallbackResult) -> Result<SettleOutcome> {
        // The status guard makes the update conditional, so a duplicate
        // delivery matches nothing instead of overwriting a terminal record.
        let filter = doc! {
            "merchant_request_id": result.merchant_request_id.as_str(),
            "status": TransactionStatus::Pending.as_str(),
        };
        let update = doc! { "$set": settlement_fields(result, Utc::now()) };

        let updated = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;

        if let Some(tx) = updated {
            return Ok(SettleOutcome::Settled(tx));
        }

        match self.find_by_merchant_request_id(&result.merchant_request_id).await? {
            Some(existing) => Ok(SettleOutcome::AlreadySettled(existing)),
            None => Ok(SettleOutcome::NotFound),
        }
    }
}
