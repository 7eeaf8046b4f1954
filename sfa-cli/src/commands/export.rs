//! `sfa export` - stream one tenant's rows as CSV

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use sfa_server::bulk::ExportHandle;
use sfa_server::{Entity, TenantId};

use super::{parse_tenant, DbArgs};

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Entity to export (accounts or opportunities)
    pub entity: Entity,

    /// Tenant whose rows are exported
    #[arg(long, value_parser = parse_tenant)]
    pub tenant: TenantId,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Deadline for the whole export, in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub db: DbArgs,
}

pub async fn run_export(args: ExportArgs) -> Result<()> {
    let guard = args.db.connect().await?;
    let deadline =
        tokio::time::Instant::now() + std::time::Duration::from_secs(args.timeout_secs);
    let handle = ExportHandle::spawn(guard, args.tenant, args.entity, deadline);

    let bytes = match &args.output {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            drain(handle, file).await?
        }
        None => drain(handle, tokio::io::stdout()).await?,
    };

    tracing::info!(entity = %args.entity, tenant = %args.tenant, bytes, "export written");
    Ok(())
}

/// Copy every chunk into `out`; returns the bytes written.
async fn drain<W>(mut handle: ExportHandle, mut out: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = handle.next_chunk().await.context("Export failed")? {
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    Ok(written)
}
