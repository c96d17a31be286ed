// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// What the provider sent back when an upstream call failed.
///
/// `status` is `None` when the request never got a response (connect error,
/// timeout).
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub status: Option<u16>,
    pub body: Value,
}

impl UpstreamFailure {
    pub fn new(status: Option<u16>, body: Value) -> Self {
        Self { status, body }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            body: Value::String(err.to_string()),
        }
    }

    /// Keeps the body as JSON when it parses, otherwise as the raw text.
    pub fn from_text(status: u16, text: String) -> Self {
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Self { status: Some(status), body }
    }

    fn to_details(&self) -> Value {
        json!({
            "status": self.status,
            "body": self.body,
        })
    }
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {}: {}", status, self.body),
            None => write!(f, "{}", self.body),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("M-Pesa authentication failed: {0}")]
    UpstreamAuthError(UpstreamFailure),

    #[error("M-Pesa payment request failed: {0}")]
    UpstreamPaymentError(UpstreamFailure),

    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Duplicate merchant request id: {0}")]
    DuplicateKey(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::ConfigurationError(_)
            | AppError::UpstreamAuthError(_)
            | AppError::UpstreamPaymentError(_)
            | AppError::MongoDB(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) => msg.clone(),
            AppError::ConfigurationError(_) => "Payment service is not configured".to_string(),
            AppError::UpstreamAuthError(_) => "Failed to get access token".to_string(),
            AppError::UpstreamPaymentError(_) => "Failed to initiate payment".to_string(),
            AppError::MongoDB(_) => "Database error".to_string(),
            AppError::TransactionNotFound(_) => "Transaction not found".to_string(),
            AppError::DuplicateKey(_) => "Duplicate entry".to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(_) => None,
            AppError::ConfigurationError(msg) => Some(Value::String(msg.clone())),
            AppError::UpstreamAuthError(failure) | AppError::UpstreamPaymentError(failure) => {
                Some(failure.to_details())
            }
            AppError::MongoDB(err) => Some(Value::String(err.to_string())),
            AppError::TransactionNotFound(id) | AppError::DuplicateKey(id) => {
                Some(json!({ "merchant_request_id": id }))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = json!({ "error": self.error_message() });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::invalid_data("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::configuration("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::UpstreamAuthError(UpstreamFailure::new(Some(401), Value::Null)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::TransactionNotFound("abc".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn upstream_body_kept_as_json_when_possible() {
        let failure = UpstreamFailure::from_text(400, r#"{"errorCode":"400.002.02"}"#.to_string());
        assert_eq!(failure.body["errorCode"], "400.002.02");

        let failure = UpstreamFailure::from_text(502, "Bad Gateway".to_string());
        assert_eq!(failure.body, Value::String("Bad Gateway".to_string()));
    }

    #[test]
    fn validation_error_has_no_details() {
        let err = AppError::invalid_data("Missing required fields");
        assert!(err.details().is_none());
        assert_eq!(err.error_message(), "Missing required fields");

        let err = AppError::UpstreamPaymentError(UpstreamFailure::new(Some(500), json!({"a": 1})));
        let details = err.details().unwrap();
        assert_eq!(details["status"], 500);
        assert_eq!(details["body"]["a"], 1);
    }
}
