//! Tenant transaction guard
//!
//! Every unit of work runs in one transaction whose session carries the
//! tenant id (`app.tenant_id`), so the row-level policies in the schema
//! restrict each statement to that tenant. Repositories additionally filter
//! on the scope's tenant; the policy is the second layer, not the only one.
//!
//! The transaction is owned by [`TenantScope`]. Whatever way the unit of
//! work ends (error, deadline, the caller dropping the future) the scope is
//! dropped with it, sqlx rolls the transaction back and the connection goes
//! back to the pool.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::{Executor, PgConnection, PgPool, Postgres, Transaction};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::DbError;
use crate::models::TenantId;

/// Units of work on the default deadline slower than this are logged at `warn`.
const SLOW_UNIT_THRESHOLD: Duration = Duration::from_millis(100);

/// Elapsed time after which a unit is reported as slow.
///
/// Units given a longer deadline than the default (streaming export, bulk
/// import) only count as slow once they have used half of it.
fn slow_after(budget: Duration, unit_timeout: Duration) -> Duration {
    if budget > unit_timeout {
        budget / 2
    } else {
        SLOW_UNIT_THRESHOLD
    }
}

/// Opens tenant-bound transactions on a shared pool.
#[derive(Debug, Clone)]
pub struct TenantGuard {
    pool: PgPool,
    unit_timeout: Duration,
}

impl TenantGuard {
    pub fn new(pool: PgPool, unit_timeout: Duration) -> Self {
        Self { pool, unit_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn unit_timeout(&self) -> Duration {
        self.unit_timeout
    }

    /// Run `work` inside a transaction bound to `tenant`, using the
    /// guard's default deadline.
    ///
    /// Commits when `work` returns `Ok`, rolls back otherwise.
    ///
    /// ```ignore
    /// let account = guard
    ///     .run(tenant, move |scope| {
    ///         Box::pin(async move { AccountRepo::new(scope).create(&input).await })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run<T, F>(&self, tenant: TenantId, work: F) -> Result<T, DbError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut TenantScope) -> BoxFuture<'s, Result<T, DbError>> + Send,
    {
        let deadline = Instant::now() + self.unit_timeout;
        self.run_until(tenant, deadline, work).await
    }

    /// Same as [`run`](Self::run) with a caller-supplied deadline.
    ///
    /// Waiting for a pooled connection counts against the deadline.
    pub async fn run_until<T, F>(
        &self,
        tenant: TenantId,
        deadline: Instant,
        work: F,
    ) -> Result<T, DbError>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut TenantScope) -> BoxFuture<'s, Result<T, DbError>> + Send,
    {
        let start = Instant::now();
        let slow = slow_after(deadline.saturating_duration_since(start), self.unit_timeout);

        let unit = async {
            let mut scope = TenantScope::open(&self.pool, tenant).await?;
            match work(&mut scope).await {
                Ok(value) => {
                    scope.commit().await?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback_err) = scope.rollback().await {
                        warn!(%tenant, error = %rollback_err, "rollback failed");
                    }
                    Err(e)
                }
            }
        };

        let result = match tokio::time::timeout_at(deadline, unit).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    %tenant,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "unit of work deadline exceeded"
                );
                Err(DbError::DeadlineExceeded)
            }
        };

        let elapsed = start.elapsed();
        if elapsed > slow {
            warn!(
                %tenant,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow unit of work"
            );
        } else {
            debug!(%tenant, elapsed_ms = elapsed.as_millis() as u64, "unit of work finished");
        }

        result
    }
}

/// A savepoint inside a [`TenantScope`].
///
/// Only the scope hands these out, so every checkpoint names a savepoint
/// that was actually created.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a checkpoint must be released or rolled back"]
pub struct Checkpoint(u32);

impl Checkpoint {
    pub(crate) fn new(seq: u32) -> Self {
        Self(seq)
    }

    pub fn name(&self) -> String {
        format!("sp_{}", self.0)
    }
}

/// The executor capability handed to a unit of work.
///
/// Valid only for the duration of the closure passed to
/// [`TenantGuard::run`].
pub struct TenantScope {
    tx: Transaction<'static, Postgres>,
    tenant: TenantId,
    savepoints: u32,
}

impl TenantScope {
    async fn open(pool: &PgPool, tenant: TenantId) -> Result<Self, DbError> {
        let mut tx = pool.begin().await?;

        // Transaction-local: reverts on commit or rollback.
        sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
            .bind(tenant.to_string())
            .execute(&mut *tx)
            .await?;

        Ok(Self {
            tx,
            tenant,
            savepoints: 0,
        })
    }

    /// Tenant bound to this transaction.
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Connection to run statements on.
    pub fn executor(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Create a savepoint that can later be reverted without losing
    /// earlier work in the transaction.
    pub async fn checkpoint(&mut self) -> Result<Checkpoint, DbError> {
        self.savepoints += 1;
        let checkpoint = Checkpoint::new(self.savepoints);
        self.simple(format!("SAVEPOINT {}", checkpoint.name())).await?;
        Ok(checkpoint)
    }

    /// Keep everything done since `checkpoint`.
    pub async fn release(&mut self, checkpoint: Checkpoint) -> Result<(), DbError> {
        self.simple(format!("RELEASE SAVEPOINT {}", checkpoint.name())).await
    }

    /// Discard everything done since `checkpoint` and clear an aborted
    /// transaction state.
    pub async fn rollback_to(&mut self, checkpoint: Checkpoint) -> Result<(), DbError> {
        let name = checkpoint.name();
        self.simple(format!("ROLLBACK TO SAVEPOINT {name}")).await?;
        self.simple(format!("RELEASE SAVEPOINT {name}")).await
    }

    /// Unprepared statement over the simple query protocol.
    async fn simple(&mut self, sql: String) -> Result<(), DbError> {
        let conn: &mut PgConnection = &mut self.tx;
        conn.execute(sql.as_str()).await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
