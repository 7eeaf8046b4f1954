//! sfa CLI - tenant-scoped CRM data service
//!
//! - `serve`: HTTP API
//! - `import`: load a CSV file for one tenant, print the per-row report
//! - `export`: stream one tenant's rows as CSV

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "sfa",
    author,
    version,
    about = "Tenant-scoped CRM data service with bulk CSV import and export"
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Import a CSV file (accounts or opportunities)
    Import(commands::import::ImportArgs),
    /// Export rows as CSV (accounts or opportunities)
    Export(commands::export::ExportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::Import(args) => commands::run_import(args).await,
        Commands::Export(args) => commands::run_export(args).await,
    };

    tracing_setup::shutdown_otel();
    result
}
