//! `sfa serve` - run the HTTP API

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use sfa_server::db::{create_lazy_pool, run_migrations};
use sfa_server::http::{run_server, ServerConfig};
use sfa_server::TenantGuard;

use super::DbArgs;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub db: DbArgs,

    /// Interface to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', env = "APP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Deployment label recorded in the startup log
    #[arg(long, env = "APP_ENV", default_value = "local")]
    pub env: String,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Time allowed to produce a response, in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest accepted import upload, in MiB
    #[arg(long, default_value_t = 32)]
    pub import_limit_mib: usize,

    /// Time allowed for one CSV import, in seconds
    #[arg(long, env = "SFA_IMPORT_TIMEOUT_SECS", default_value_t = 600)]
    pub import_timeout_secs: u64,

    /// Apply pending schema migrations before serving
    #[arg(long, env = "SFA_MIGRATE")]
    pub migrate: bool,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            cors_permissive: self.cors_permissive,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            import_limit: self.import_limit_mib * 1024 * 1024,
            import_timeout: Duration::from_secs(self.import_timeout_secs),
            ..ServerConfig::default()
        }
    }
}

/// Run the HTTP server until Ctrl+C / SIGTERM.
///
/// The pool connects lazily so liveness answers while the database is down.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let pool_config = args.db.pool_config();
    let pool = create_lazy_pool(&pool_config).context("Invalid database configuration")?;
    let guard = TenantGuard::new(pool, pool_config.unit_timeout);
    let config = args.server_config();

    if args.migrate {
        run_migrations(guard.pool())
            .await
            .context("Failed to apply migrations")?;
        tracing::info!("migrations applied");
    }

    tracing::info!(
        env = %args.env,
        bind = %config.bind_addr,
        max_connections = pool_config.max_connections,
        "starting sfa server"
    );

    run_server(guard, config).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_server_config() {
        let args = ServeArgs::try_parse_from([
            "serve",
            "--port",
            "9090",
            "--import-limit-mib",
            "1",
            "--cors-permissive",
            "--import-timeout-secs",
            "120",
        ])
        .unwrap();

        let config = args.server_config();
        assert_eq!(config.bind_addr.port(), 9090);
        assert_eq!(config.import_limit, 1024 * 1024);
        assert!(config.cors_permissive);
        assert_eq!(config.import_timeout, Duration::from_secs(120));
    }
}
