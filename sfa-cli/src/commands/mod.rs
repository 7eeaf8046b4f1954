//! Command implementations for the sfa CLI

pub mod export;
pub mod import;
pub mod serve;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use sfa_server::db::{create_pool, PoolConfig, DEFAULT_DATABASE_URL};
use sfa_server::{TenantGuard, TenantId};

pub use export::run_export;
pub use import::run_import;
pub use serve::run_serve;

/// Database connection options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "APP_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Pool size
    #[arg(long, env = "SFA_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Deadline for one unit of work, in seconds
    #[arg(long, env = "SFA_UNIT_TIMEOUT_SECS", default_value_t = 30)]
    pub unit_timeout_secs: u64,
}

impl DbArgs {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
            unit_timeout: Duration::from_secs(self.unit_timeout_secs),
            ..PoolConfig::default()
        }
    }

    /// Connect and wrap the pool in a tenant guard.
    pub async fn connect(&self) -> Result<TenantGuard> {
        let config = self.pool_config();
        let pool = create_pool(&config)
            .await
            .context("Failed to connect to the database (check APP_DATABASE_URL)")?;
        Ok(TenantGuard::new(pool, config.unit_timeout))
    }
}

/// `--tenant` value parser.
pub fn parse_tenant(raw: &str) -> Result<TenantId, String> {
    TenantId::parse(raw).map_err(|e| e.to_string())
}
