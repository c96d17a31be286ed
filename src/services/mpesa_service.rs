// services/mpesa_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::{AppError, Result, UpstreamFailure};
use crate::models::payment::PaymentOrder;

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct StkPushPayload {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: i64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode", default)]
    pub response_code: Option<String>,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: Option<String>,
}

/// A push the provider accepted, with its response body untouched.
#[derive(Debug, Clone)]
pub struct AcceptedPush {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub raw: Value,
}

/// Strips one leading `0` (or a `+`) and makes sure the number starts with
/// the country code. Numbers already carrying the code pass through.
pub fn format_phone_number(phone: &str, country_code: &str) -> String {
    let phone = phone.trim();
    let phone = phone.strip_prefix('+').unwrap_or(phone);

    if phone.starts_with(country_code) {
        return phone.to_string();
    }
    if let Some(local) = phone.strip_prefix('0') {
        return format!("{}{}", country_code, local);
    }
    // Subscriber number without the trunk zero, e.g. 712345678
    if phone.len() == 9 {
        return format!("{}{}", country_code, phone);
    }
    phone.to_string()
}

/// `YYYYMMDDHHMMSS`; the same string must go into the password.
pub fn generate_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

pub fn generate_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    base64.encode(format!("{}{}{}", short_code, passkey, timestamp))
}

#[derive(Debug, Clone)]
pub struct MpesaService {
    config: Arc<AppConfig>,
    client: Client,
}

impl MpesaService {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.mpesa_http_timeout_secs))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(MpesaService { config, client })
    }

    pub async fn get_access_token(&self) -> Result<String> {
        info!("Requesting new access token");
        let auth_string = format!(
            "{}:{}",
            self.config.mpesa_consumer_key, self.config.mpesa_consumer_secret
        );
        let encoded_auth = base64.encode(auth_string);

        let (auth_url, _) = self.config.get_mpesa_urls();

        let response = self
            .client
            .get(&auth_url)
            .header(header::AUTHORIZATION, format!("Basic {}", encoded_auth))
            .send()
            .await
            .map_err(|e| {
                error!("Access token request failed: {}", e);
                AppError::UpstreamAuthError(UpstreamFailure::transport(&e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamAuthError(UpstreamFailure::transport(&e)))?;

        if !status.is_success() {
            error!("Failed to get access token: {} - {}", status, body);
            return Err(AppError::UpstreamAuthError(UpstreamFailure::from_text(
                status.as_u16(),
                body,
            )));
        }

        let auth_response: AuthResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Unexpected access token response: {}", e);
            AppError::UpstreamAuthError(UpstreamFailure::from_text(status.as_u16(), body.clone()))
        })?;

        info!("Access token obtained");
        Ok(auth_response.access_token)
    }

    pub fn build_payload(&self, order: &PaymentOrder, timestamp: String) -> StkPushPayload {
        let password = generate_password(
            &self.config.mpesa_short_code,
            &self.config.mpesa_passkey,
            &timestamp,
        );

        StkPushPayload {
            business_short_code: self.config.mpesa_short_code.clone(),
            password,
            timestamp,
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount: order.amount,
            party_a: order.phone_number.clone(),
            party_b: self.config.mpesa_short_code.clone(),
            phone_number: order.phone_number.clone(),
            callback_url: self.config.mpesa_callback_url.clone(),
            account_reference: order.account_reference.clone(),
            transaction_desc: order.transaction_desc.clone(),
        }
    }

    // C2B: Customer to Business
    pub async fn initiate_stk_push(&self, order: &PaymentOrder) -> Result<AcceptedPush> {
        self.config.ensure_mpesa_credentials()?;

        info!("C2B: STK push for {} - KSh {}", order.phone_number, order.amount);

        let access_token = self.get_access_token().await?;
        let stk_request = self.build_payload(order, generate_timestamp(Utc::now()));

        let (_, stk_url) = self.config.get_mpesa_urls();

        let response = self
            .client
            .post(&stk_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&stk_request)
            .send()
            .await
            .map_err(|e| {
                error!("C2B request failed: {}", e);
                AppError::UpstreamPaymentError(UpstreamFailure::transport(&e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamPaymentError(UpstreamFailure::transport(&e)))?;

        if !status.is_success() {
            error!("C2B failed: {} - {}", status, body);
            return Err(AppError::UpstreamPaymentError(UpstreamFailure::from_text(
                status.as_u16(),
                body,
            )));
        }

        let rejected = || AppError::UpstreamPaymentError(UpstreamFailure::from_text(status.as_u16(), body.clone()));

        let raw: Value = serde_json::from_str(&body).map_err(|_| rejected())?;
        let stk_response: StkPushResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            error!("C2B response missing correlation ids: {}", e);
            rejected()
        })?;

        if let Some(code) = stk_response.response_code.as_deref().filter(|code| *code != "0") {
            error!("C2B rejected with ResponseCode {}: {}", code, body);
            return Err(rejected());
        }

        info!(
            "C2B initiated: {} ({})",
            stk_response.merchant_request_id,
            stk_response.customer_message.as_deref().unwrap_or("no customer message")
        );

        Ok(AcceptedPush {
            merchant_request_id: stk_response.merchant_request_id,
            checkout_request_id: stk_response.checkout_request_id,
            raw,
        })
    }
}
