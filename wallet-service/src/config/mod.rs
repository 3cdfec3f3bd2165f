use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct WalletConfig {
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl WalletConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let url = env::var("WALLET_DATABASE_URL").context("WALLET_DATABASE_URL must be set")?;
        let max_connections = env::var("WALLET_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("WALLET_DB_MAX_CONNECTIONS must be an integer")?;
        let min_connections = env::var("WALLET_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("WALLET_DB_MIN_CONNECTIONS must be an integer")?;
        let log_level = env::var("WALLET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            service_name: "wallet-service".to_string(),
            log_level,
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
            },
        })
    }
}
