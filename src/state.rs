use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::TransactionStore;
use crate::errors::Result;
use crate::services::mpesa_service::MpesaService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub mpesa_service: Arc<MpesaService>,
    pub store: Arc<dyn TransactionStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn TransactionStore>) -> Result<Self> {
        let config = Arc::new(config);
        let mpesa_service = Arc::new(MpesaService::new(config.clone())?);

        Ok(AppState {
            config,
            mpesa_service,
            store,
        })
    }
}
