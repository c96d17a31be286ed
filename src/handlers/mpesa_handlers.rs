// handlers/mpesa_handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::database::SettleOutcome;
use crate::errors::{AppError, Result};
use crate::models::callback::{CallbackAck, CallbackResult, MpesaCallback};
use crate::models::payment::StkPushRequest;
use crate::models::transaction::{MpesaTransaction, NewMpesaTransaction, TransactionView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub merchant_request_id: Option<String>,
}

// C2B Handlers
pub async fn initiate_stk_push(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StkPushRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected STK push body: {}", rejection.body_text());
        AppError::invalid_data(rejection.body_text())
    })?;
    info!("Received STK push request: {:?}", request);

    let order = request.into_order(&state.config.mpesa_country_code)?;
    let accepted = state.mpesa_service.initiate_stk_push(&order).await?;

    let tx = MpesaTransaction::pending(NewMpesaTransaction {
        phone_number: order.phone_number,
        amount: order.amount,
        account_reference: order.account_reference,
        transaction_desc: order.transaction_desc,
        merchant_request_id: accepted.merchant_request_id.clone(),
        checkout_request_id: accepted.checkout_request_id.clone(),
    });

    state.store.insert(tx).await.map_err(|e| {
        error!(
            "STK push {} accepted but not recorded: {}",
            accepted.merchant_request_id, e
        );
        e
    })?;

    info!("STK push initiated: {}", accepted.merchant_request_id);
    Ok(Json(accepted.raw))
}

/// Always answers in the `{ResultCode, ResultDesc}` envelope; anything else
/// makes M-Pesa retry the delivery.
pub async fn mpesa_callback(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MpesaCallback>, JsonRejection>,
) -> impl IntoResponse {
    let callback = match payload {
        Ok(Json(callback)) => callback,
        Err(rejection) => {
            error!("Malformed M-Pesa callback: {}", rejection.body_text());
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(CallbackAck::processing_failed()));
        }
    };

    let result = CallbackResult::from(callback.body.stk_callback);
    info!(
        "Received M-Pesa callback for {}: {} - {}",
        result.merchant_request_id, result.result_code, result.result_desc
    );

    match state.store.settle(&result).await {
        Ok(SettleOutcome::Settled(tx)) => {
            info!("Transaction {} is now {}", tx.merchant_request_id, tx.status.as_str());
        }
        Ok(SettleOutcome::AlreadySettled(tx)) => {
            info!(
                "Duplicate callback for {}; already {}",
                tx.merchant_request_id,
                tx.status.as_str()
            );
        }
        Ok(SettleOutcome::NotFound) => {
            warn!("No transaction matches MerchantRequestID {}", result.merchant_request_id);
        }
        Err(e) => {
            error!("Callback processing error for {}: {}", result.merchant_request_id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(CallbackAck::processing_failed()));
        }
    }

    (StatusCode::OK, Json(CallbackAck::echo(&result)))
}

pub async fn check_transaction_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<TransactionView>> {
    let merchant_request_id = query
        .merchant_request_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::invalid_data("merchant_request_id is required"))?;

    let tx = state
        .store
        .find_by_merchant_request_id(&merchant_request_id)
        .await?
        .ok_or(AppError::TransactionNotFound(merchant_request_id))?;

    Ok(Json(tx.into()))
}
