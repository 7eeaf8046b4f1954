//! Streaming CSV export
//!
//! Rows are read through a server-side cursor in insertion order and
//! rendered in chunks that are handed to the consumer over a bounded
//! channel. At most one chunk plus the channel capacity is held in memory
//! regardless of tenant size.
//!
//! When the consumer goes away the next send fails, the unit of work ends
//! with [`DbError::Cancelled`] and the transaction is rolled back.

use futures::stream::{Stream, TryStreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Entity;
use crate::db::{Account, AccountRepo, DbError, Opportunity, OpportunityRepo, TenantGuard};
use crate::models::{wire, TenantId};

/// Version of the column layout, sent as `X-Export-Version`.
pub const EXPORT_VERSION: &str = "1";

/// Rows rendered before a chunk is handed to the consumer.
const CHUNK_ROWS: usize = 256;

/// Initial buffer size of one chunk.
const CHUNK_BYTES: usize = 64 * 1024;

/// Chunks buffered between the database reader and the consumer.
const CHANNEL_CAPACITY: usize = 8;

/// A persisted entity with a fixed CSV layout.
pub trait CsvRecord {
    const COLUMNS: &'static [&'static str];

    /// Cells in [`COLUMNS`](Self::COLUMNS) order.
    fn fields(&self) -> Vec<String>;
}

impl CsvRecord for Account {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "owner_user_id",
        "name",
        "industry",
        "website",
        "phone",
        "status",
        "memo",
        "created_at",
        "updated_at",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.owner_user_id.to_string(),
            self.name.clone(),
            wire::render_optional_text(self.industry.as_deref()),
            wire::render_optional_text(self.website.as_deref()),
            wire::render_optional_text(self.phone.as_deref()),
            self.status.to_string(),
            wire::render_optional_text(self.memo.as_deref()),
            wire::render_timestamp(self.created_at),
            wire::render_timestamp(self.updated_at),
        ]
    }
}

impl CsvRecord for Opportunity {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "contact_id",
        "owner_user_id",
        "name",
        "stage",
        "probability",
        "amount",
        "expected_close_date",
        "next_action_at",
        "next_action_note",
        "created_at",
        "updated_at",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.account_id.to_string(),
            wire::render_optional_uuid(self.contact_id),
            self.owner_user_id.to_string(),
            self.name.clone(),
            self.stage.to_string(),
            self.probability.to_string(),
            wire::render_amount(&self.amount),
            wire::render_optional_date(self.expected_close_date),
            wire::render_optional_timestamp(self.next_action_at),
            wire::render_optional_text(self.next_action_note.as_deref()),
            wire::render_timestamp(self.created_at),
            wire::render_timestamp(self.updated_at),
        ]
    }
}

/// Render `rows` as CSV into `sink`, one chunk per [`CHUNK_ROWS`] rows.
///
/// The header is always sent, so a successful export yields at least one
/// chunk. Returns the number of data rows written.
pub async fn write_csv<R, S>(mut rows: S, sink: &mpsc::Sender<Vec<u8>>) -> Result<u64, DbError>
where
    R: CsvRecord,
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    let mut out = chunk_writer();
    out.write_record(R::COLUMNS)?;

    let mut written = 0u64;
    let mut pending = 0usize;
    while let Some(row) = rows.try_next().await? {
        out.write_record(row.fields())?;
        written += 1;
        pending += 1;
        if pending >= CHUNK_ROWS {
            send_chunk(std::mem::replace(&mut out, chunk_writer()), sink).await?;
            pending = 0;
        }
    }
    send_chunk(out, sink).await?;

    Ok(written)
}

/// Writer for one chunk; only the first chunk carries the header row.
fn chunk_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::with_capacity(CHUNK_BYTES))
}

async fn send_chunk(
    out: csv::Writer<Vec<u8>>,
    sink: &mpsc::Sender<Vec<u8>>,
) -> Result<(), DbError> {
    let chunk = out
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    if chunk.is_empty() {
        return Ok(());
    }
    sink.send(chunk).await.map_err(|_| DbError::Cancelled)
}

/// Export every `entity` row of `tenant` into `sink` in one unit of work.
pub async fn export(
    guard: &TenantGuard,
    tenant: TenantId,
    entity: Entity,
    deadline: tokio::time::Instant,
    sink: mpsc::Sender<Vec<u8>>,
) -> Result<u64, DbError> {
    let rows = guard
        .run_until(tenant, deadline, move |scope| {
            Box::pin(async move {
                match entity {
                    Entity::Accounts => write_csv(AccountRepo::new(scope).stream(), &sink).await,
                    Entity::Opportunities => {
                        write_csv(OpportunityRepo::new(scope).stream(), &sink).await
                    }
                }
            })
        })
        .await?;

    info!(%tenant, entity = entity.as_str(), rows, "export finished");
    Ok(rows)
}

/// A running export on its own task.
///
/// Dropping the handle aborts the task, which rolls back its transaction.
pub struct ExportHandle {
    rx: mpsc::Receiver<Vec<u8>>,
    task: Option<JoinHandle<Result<u64, DbError>>>,
}

impl ExportHandle {
    pub fn spawn(
        guard: TenantGuard,
        tenant: TenantId,
        entity: Entity,
        deadline: tokio::time::Instant,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(async move { export(&guard, tenant, entity, deadline, tx).await });
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Next chunk of CSV text; `Ok(None)` once the export has completed.
    ///
    /// A failure of the export task is reported once the chunks it sent
    /// before failing have been drained.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DbError> {
        if let Some(chunk) = self.rx.recv().await {
            return Ok(Some(chunk));
        }

        let Some(task) = self.task.take() else {
            return Ok(None);
        };
        match task.await {
            Ok(result) => result.map(|rows| {
                debug!(rows, "export stream drained");
                None
            }),
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(_) => Err(DbError::Cancelled),
        }
    }
}

impl Drop for ExportHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
