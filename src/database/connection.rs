use anyhow::Context;
use mongodb::{Client, Database};

use crate::config::AppConfig;

pub async fn get_db_client(config: &AppConfig) -> anyhow::Result<Database> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to use the MongoDB store")?;

    let client = Client::with_uri_str(database_url)
        .await
        .context("Failed to connect to MongoDB")?;

    let db = client.database(&config.database_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!("✅ Connected to database: {}", config.database_name);
            tracing::debug!("Collections found: {:?}", collections);
        }
        Err(e) => {
            tracing::warn!("Database '{}' may not exist or is inaccessible: {}", config.database_name, e);
        }
    }

    Ok(db)
}
