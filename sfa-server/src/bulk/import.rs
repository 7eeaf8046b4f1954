//! Bulk CSV import
//!
//! The whole batch runs in one tenant transaction. Each row that passes
//! validation is written under its own savepoint: a row whose statement
//! fails is rolled back to that savepoint and reported, while earlier rows
//! stay in the transaction. The opportunity follow-up update gets a nested
//! savepoint so its failure keeps the already inserted opportunity.
//!
//! `inserted` therefore counts exactly the rows that are durable once the
//! batch commits. Storage failures that are not tied to one row (lost
//! connection, deadline, savepoint failure) abort the whole batch.

use async_trait::async_trait;
use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::csv_table::{CsvTable, HeaderIndex};
use super::Entity;
use crate::db::{AccountRepo, Checkpoint, DbError, OpportunityRepo, TenantGuard, TenantScope};
use crate::models::{
    NewAccount, NewOpportunity, NextAction, RawAccount, RawOpportunity, TenantId, ValidationError,
};

/// Aggregate outcome of one import call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub errors: Vec<String>,
}

/// Diagnostic for one input row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row {row}: missing {}", .fields.join(", "))]
    Missing {
        row: usize,
        fields: Vec<&'static str>,
    },

    #[error("row {row}: invalid {field}")]
    Invalid { row: usize, field: &'static str },

    #[error("row {row}: {reason}")]
    Persistence { row: usize, reason: String },

    #[error("row {row}: next_action_at not applied: {reason}")]
    FollowUp { row: usize, reason: String },
}

impl RowError {
    fn invalid(row: usize, err: &ValidationError) -> Self {
        RowError::Invalid {
            row,
            field: err.field(),
        }
    }
}

/// Write side of the import pipeline.
///
/// Implemented by [`TenantScope`]; tests substitute an in-memory store.
#[async_trait]
pub trait ImportStore: Send {
    async fn checkpoint(&mut self) -> Result<Checkpoint, DbError>;
    async fn release(&mut self, checkpoint: Checkpoint) -> Result<(), DbError>;
    async fn rollback_to(&mut self, checkpoint: Checkpoint) -> Result<(), DbError>;

    async fn insert_account(&mut self, account: &NewAccount) -> Result<Uuid, DbError>;
    async fn insert_opportunity(&mut self, opportunity: &NewOpportunity)
        -> Result<Uuid, DbError>;
    async fn set_next_action(&mut self, id: Uuid, action: &NextAction) -> Result<(), DbError>;
}

#[async_trait]
impl ImportStore for TenantScope {
    async fn checkpoint(&mut self) -> Result<Checkpoint, DbError> {
        TenantScope::checkpoint(self).await
    }

    async fn release(&mut self, checkpoint: Checkpoint) -> Result<(), DbError> {
        TenantScope::release(self, checkpoint).await
    }

    async fn rollback_to(&mut self, checkpoint: Checkpoint) -> Result<(), DbError> {
        TenantScope::rollback_to(self, checkpoint).await
    }

    async fn insert_account(&mut self, account: &NewAccount) -> Result<Uuid, DbError> {
        Ok(AccountRepo::new(self).create(account).await?.id)
    }

    async fn insert_opportunity(
        &mut self,
        opportunity: &NewOpportunity,
    ) -> Result<Uuid, DbError> {
        Ok(OpportunityRepo::new(self).create(opportunity).await?.id)
    }

    async fn set_next_action(&mut self, id: Uuid, action: &NextAction) -> Result<(), DbError> {
        OpportunityRepo::new(self).set_next_action(id, action).await?;
        Ok(())
    }
}

/// An entity that can be read from one CSV row and persisted.
#[async_trait]
pub trait ImportRow: Sized + Send + Sync {
    /// Blank required cells, in column order.
    fn missing(header: &HeaderIndex, record: &StringRecord) -> Vec<&'static str>;

    fn parse(header: &HeaderIndex, record: &StringRecord) -> Result<Self, ValidationError>;

    async fn insert<S: ImportStore + ?Sized>(&self, store: &mut S) -> Result<Uuid, DbError>;

    /// Dependent update applied after a successful insert.
    fn next_action(&self) -> Option<&NextAction> {
        None
    }
}

fn raw_account<'r>(header: &HeaderIndex, record: &'r StringRecord) -> RawAccount<'r> {
    RawAccount {
        owner_user_id: header.cell(record, "owner_user_id"),
        name: header.cell(record, "name"),
        industry: header.cell(record, "industry"),
        website: header.cell(record, "website"),
        phone: header.cell(record, "phone"),
        status: header.cell(record, "status"),
        memo: header.cell(record, "memo"),
    }
}

fn raw_opportunity<'r>(header: &HeaderIndex, record: &'r StringRecord) -> RawOpportunity<'r> {
    RawOpportunity {
        account_id: header.cell(record, "account_id"),
        contact_id: header.cell(record, "contact_id"),
        owner_user_id: header.cell(record, "owner_user_id"),
        name: header.cell(record, "name"),
        stage: header.cell(record, "stage"),
        probability: header.cell(record, "probability"),
        amount: header.cell(record, "amount"),
        expected_close_date: header.cell(record, "expected_close_date"),
        next_action_at: header.cell(record, "next_action_at"),
        next_action_note: header.cell(record, "next_action_note"),
    }
}

#[async_trait]
impl ImportRow for NewAccount {
    fn missing(header: &HeaderIndex, record: &StringRecord) -> Vec<&'static str> {
        raw_account(header, record).missing()
    }

    fn parse(header: &HeaderIndex, record: &StringRecord) -> Result<Self, ValidationError> {
        NewAccount::parse(raw_account(header, record))
    }

    async fn insert<S: ImportStore + ?Sized>(&self, store: &mut S) -> Result<Uuid, DbError> {
        store.insert_account(self).await
    }
}

#[async_trait]
impl ImportRow for NewOpportunity {
    fn missing(header: &HeaderIndex, record: &StringRecord) -> Vec<&'static str> {
        raw_opportunity(header, record).missing()
    }

    fn parse(header: &HeaderIndex, record: &StringRecord) -> Result<Self, ValidationError> {
        NewOpportunity::parse(raw_opportunity(header, record))
    }

    async fn insert<S: ImportStore + ?Sized>(&self, store: &mut S) -> Result<Uuid, DbError> {
        store.insert_opportunity(self).await
    }

    fn next_action(&self) -> Option<&NextAction> {
        self.next_action.as_ref()
    }
}

/// Failure confined to the statement that raised it.
fn is_row_failure(err: &DbError) -> bool {
    err.is_statement_failure() || matches!(err, DbError::NotFound { .. })
}

/// Run every row of `table` against `store` in input order.
pub async fn import_rows<R, S>(store: &mut S, table: &CsvTable) -> Result<ImportReport, DbError>
where
    R: ImportRow,
    S: ImportStore + ?Sized,
{
    let header = table.header();
    let mut report = ImportReport::default();

    for (row, record) in table.rows() {
        let missing = R::missing(header, record);
        if !missing.is_empty() {
            record_error(&mut report, RowError::Missing { row, fields: missing });
            continue;
        }

        let item = match R::parse(header, record) {
            Ok(item) => item,
            Err(e) => {
                record_error(&mut report, RowError::invalid(row, &e));
                continue;
            }
        };

        let row_checkpoint = store.checkpoint().await?;
        let id = match item.insert(store).await {
            Ok(id) => id,
            Err(e) if is_row_failure(&e) => {
                store.rollback_to(row_checkpoint).await?;
                record_error(
                    &mut report,
                    RowError::Persistence {
                        row,
                        reason: e.reason(),
                    },
                );
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(action) = item.next_action() {
            let follow_up = store.checkpoint().await?;
            match store.set_next_action(id, action).await {
                Ok(()) => store.release(follow_up).await?,
                Err(e) if is_row_failure(&e) => {
                    store.rollback_to(follow_up).await?;
                    record_error(
                        &mut report,
                        RowError::FollowUp {
                            row,
                            reason: e.reason(),
                        },
                    );
                }
                Err(e) => return Err(e),
            }
        }

        store.release(row_checkpoint).await?;
        report.inserted += 1;
    }

    Ok(report)
}

fn record_error(report: &mut ImportReport, err: RowError) {
    debug!(error = %err, "row rejected");
    report.errors.push(err.to_string());
}

/// Import `table` as `entity` for `tenant` in one unit of work that must
/// finish by `deadline`.
pub async fn import(
    guard: &TenantGuard,
    tenant: TenantId,
    entity: Entity,
    table: CsvTable,
    deadline: tokio::time::Instant,
) -> Result<ImportReport, DbError> {
    let rows = table.row_count();
    let report = guard
        .run_until(tenant, deadline, move |scope| {
            Box::pin(async move {
                match entity {
                    Entity::Accounts => import_rows::<NewAccount, _>(scope, &table).await,
                    Entity::Opportunities => import_rows::<NewOpportunity, _>(scope, &table).await,
                }
            })
        })
        .await?;

    info!(
        %tenant,
        entity = entity.as_str(),
        rows,
        inserted = report.inserted,
        errors = report.errors.len(),
        "import finished"
    );
    Ok(report)
}
