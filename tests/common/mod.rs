#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use stk_gateway::build_router;
use stk_gateway::config::{AppConfig, StoreBackend};
use stk_gateway::database::InMemoryTransactionStore;
use stk_gateway::state::AppState;

pub const SHORT_CODE: &str = "174379";
pub const PASSKEY: &str = "test-passkey";
/// base64("test-key:test-secret")
pub const BASIC_AUTH: &str = "Basic dGVzdC1rZXk6dGVzdC1zZWNyZXQ=";
pub const ACCESS_TOKEN: &str = "test-access-token";

pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        mpesa_consumer_key: "test-key".to_string(),
        mpesa_consumer_secret: "test-secret".to_string(),
        mpesa_short_code: SHORT_CODE.to_string(),
        mpesa_passkey: PASSKEY.to_string(),
        mpesa_callback_url: "https://gateway.example.com/api/mpesa/callback".to_string(),
        mpesa_environment: "sandbox".to_string(),
        mpesa_base_url: Some(base_url.to_string()),
        mpesa_country_code: "254".to_string(),
        mpesa_http_timeout_secs: 5,
        store_backend: StoreBackend::Memory,
        database_url: None,
        database_name: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryTransactionStore,
}

impl TestApp {
    pub fn new(config: AppConfig) -> Self {
        let store = InMemoryTransactionStore::new();
        let state = AppState::new(config, Arc::new(store.clone())).expect("app state");
        Self {
            router: build_router(state),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(post_json(uri, body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn stk_callback(merchant_request_id: &str, result_code: i64, result_desc: &str, items: Option<Value>) -> Value {
    let mut callback = serde_json::json!({
        "MerchantRequestID": merchant_request_id,
        "CheckoutRequestID": format!("ws_CO_{}", merchant_request_id),
        "ResultCode": result_code,
        "ResultDesc": result_desc,
    });
    if let Some(items) = items {
        callback["CallbackMetadata"] = serde_json::json!({ "Item": items });
    }
    serde_json::json!({ "Body": { "stkCallback": callback } })
}
