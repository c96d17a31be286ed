// config.rs
use anyhow::Context;
use std::env;

use crate::errors::{AppError, Result};

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

/// Which backend holds transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("TRANSACTION_STORE must be 'mongodb' or 'memory', got '{}'", other),
        }
    }
}

/// Process configuration, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mpesa_consumer_key: String,
    pub mpesa_consumer_secret: String,
    pub mpesa_short_code: String,
    pub mpesa_passkey: String,
    pub mpesa_callback_url: String,
    pub mpesa_environment: String,
    /// Overrides the environment-derived base URL when set.
    pub mpesa_base_url: Option<String>,
    pub mpesa_country_code: String,
    pub mpesa_http_timeout_secs: u64,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_name: String,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    /// Reads the process environment (after loading `.env` if present).
    ///
    /// Missing M-Pesa credentials are tolerated here so callbacks keep being
    /// acknowledged; initiation reports them through
    /// [`AppConfig::ensure_mpesa_credentials`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend =
            StoreBackend::parse(&env::var("TRANSACTION_STORE").unwrap_or_else(|_| "mongodb".to_string()))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if store_backend == StoreBackend::MongoDb && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when TRANSACTION_STORE is mongodb");
        }

        Ok(AppConfig {
            mpesa_consumer_key: env::var("MPESA_CONSUMER_KEY").unwrap_or_default(),
            mpesa_consumer_secret: env::var("MPESA_CONSUMER_SECRET").unwrap_or_default(),
            mpesa_short_code: env::var("MPESA_SHORT_CODE").unwrap_or_default(),
            mpesa_passkey: env::var("MPESA_PASSKEY").unwrap_or_default(),
            mpesa_callback_url: env::var("MPESA_CALLBACK_URL").unwrap_or_default(),
            mpesa_environment: env::var("MPESA_ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string()),
            mpesa_base_url: env::var("MPESA_BASE_URL").ok().filter(|url| !url.trim().is_empty()),
            mpesa_country_code: env::var("MPESA_COUNTRY_CODE").unwrap_or_else(|_| "254".to_string()),
            mpesa_http_timeout_secs: env::var("MPESA_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("MPESA_HTTP_TIMEOUT_SECS must be a number of seconds")?,
            store_backend,
            database_url,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "stk_gateway".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a number")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.mpesa_environment == "production"
    }

    pub fn base_url(&self) -> &str {
        match &self.mpesa_base_url {
            Some(url) => url.trim_end_matches('/'),
            None if self.is_production() => PRODUCTION_BASE_URL,
            None => SANDBOX_BASE_URL,
        }
    }

    /// Returns `(auth_url, stk_url)`.
    pub fn get_mpesa_urls(&self) -> (String, String) {
        let base_url = self.base_url();
        let auth_url = format!("{}/oauth/v1/generate?grant_type=client_credentials", base_url);
        let stk_url = format!("{}/mpesa/stkpush/v1/processrequest", base_url);
        (auth_url, stk_url)
    }

    /// Names every unset credential in one `ConfigurationError`.
    pub fn ensure_mpesa_credentials(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("MPESA_CONSUMER_KEY", &self.mpesa_consumer_key),
            ("MPESA_CONSUMER_SECRET", &self.mpesa_consumer_secret),
            ("MPESA_SHORT_CODE", &self.mpesa_short_code),
            ("MPESA_PASSKEY", &self.mpesa_passkey),
            ("MPESA_CALLBACK_URL", &self.mpesa_callback_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::configuration(format!("missing {}", missing.join(", "))))
        }
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.mpesa_environment,
            "is_production": self.is_production(),
            "base_url": self.base_url(),
            "business_shortcode": self.mpesa_short_code,
            "callback_url": self.mpesa_callback_url,
            "consumer_key_set": !self.mpesa_consumer_key.is_empty(),
            "consumer_secret_set": !self.mpesa_consumer_secret.is_empty(),
            "passkey_set": !self.mpesa_passkey.is_empty(),
            "store": format!("{:?}", self.store_backend),
            "port": self.port,
            "host": self.host,
        })
    }
}
