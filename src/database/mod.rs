use async_trait::async_trait;

use crate::errors::Result;
use crate::models::callback::CallbackResult;
use crate::models::transaction::MpesaTransaction;

pub mod connection;
pub mod memory;
pub mod transactions;

pub use memory::InMemoryTransactionStore;
pub use transactions::MongoTransactionStore;

/// What a callback did to the stored transaction.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// The pending record moved to its terminal state.
    Settled(MpesaTransaction),
    /// The record was already terminal; nothing changed.
    AlreadySettled(MpesaTransaction),
    /// No record carries this merchant request id.
    NotFound,
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, tx: MpesaTransaction) -> Result<()>;

    async fn find_by_merchant_request_id(&self, merchant_request_id: &str) -> Result<Option<MpesaTransaction>>;

    /// Applies a callback to the record with the same merchant request id,
    /// only if that record is still pending.
    async fn settle(&self, result: &CallbackResult) -> Result<SettleOutcome>;
}
