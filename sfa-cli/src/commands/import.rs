//! `sfa import` - load a CSV file for one tenant

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use sfa_server::bulk::import::import;
use sfa_server::bulk::CsvTable;
use sfa_server::{Entity, TenantId};

use super::{parse_tenant, DbArgs};

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Entity to import (accounts or opportunities)
    pub entity: Entity,

    /// CSV file with a header row
    pub file: PathBuf,

    /// Tenant that owns the imported rows
    #[arg(long, value_parser = parse_tenant)]
    pub tenant: TenantId,

    /// Time allowed for the whole import, in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub db: DbArgs,
}

/// Run the import and print the report as JSON.
pub async fn run_import(args: ImportArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let table = CsvTable::parse(&bytes)
        .with_context(|| format!("{} is not a usable CSV file", args.file.display()))?;

    let guard = args.db.connect().await?;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.timeout_secs);
    let report = import(&guard, args.tenant, args.entity, table, deadline)
        .await
        .context("Import failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
