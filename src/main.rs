use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

use stk_gateway::config::{AppConfig, StoreBackend};
use stk_gateway::database::{
    connection::get_db_client, InMemoryTransactionStore, MongoTransactionStore, TransactionStore,
};
use stk_gateway::state::AppState;
use stk_gateway::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("🌐 Environment: {}", config.mpesa_environment);
    tracing::info!("📱 Short code: {}", config.mpesa_short_code);

    if let Err(e) = config.ensure_mpesa_credentials() {
        tracing::warn!("M-Pesa is not fully configured, STK push will fail: {}", e);
    }

    let store = initialize_store(&config).await?;
    let app_state = AppState::new(config.clone(), store)?;

    let app = build_router(app_state);
    start_server(&config, app).await
}

async fn initialize_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TransactionStore>> {
    match config.store_backend {
        StoreBackend::MongoDb => {
            let db = get_db_client(config).await?;
            let store = MongoTransactionStore::new(&db);
            store.ensure_indexes().await?;
            tracing::info!("✅ MongoDB transaction store ready");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory transaction store; records are lost on restart");
            Ok(Arc::new(InMemoryTransactionStore::new()))
        }
    }
}

async fn start_server(config: &AppConfig, app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind to {}: {}", addr, e);
        e
    })?;
    axum::serve(listener, app).await?;
    Ok(())
}
