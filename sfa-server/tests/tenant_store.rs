//! Database-backed tests for the tenant guard, repositories and bulk pipelines.
//!
//! Run with a reachable PostgreSQL and `DATABASE_URL` set:
//! `cargo test -p sfa-server -- --ignored`

use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use sfa_server::bulk::import::import;
use sfa_server::bulk::{CsvTable, Entity, ExportHandle};
use sfa_server::db::{AccountRepo, DbError, OpportunityRepo, TenantGuard};
use sfa_server::models::{NewAccount, NextAction, Pagination, RawAccount, TenantId};
use sfa_server::ImportReport;

const OWNER: &str = "11111111-1111-1111-1111-111111111111";

fn guard(pool: PgPool) -> TenantGuard {
    TenantGuard::new(pool, Duration::from_secs(30))
}

fn tenant() -> TenantId {
    TenantId::parse(&Uuid::new_v4().to_string()).unwrap()
}

fn account(name: &str) -> NewAccount {
    NewAccount::parse(RawAccount {
        owner_user_id: OWNER,
        name,
        ..Default::default()
    })
    .unwrap()
}

async fn import_csv(
    guard: &TenantGuard,
    tenant: TenantId,
    entity: Entity,
    csv: &str,
) -> Result<ImportReport> {
    let table = CsvTable::parse(csv.as_bytes())?;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    Ok(import(guard, tenant, entity, table, deadline).await?)
}

async fn export_text(guard: &TenantGuard, tenant: TenantId, entity: Entity) -> Result<String> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    let mut handle = ExportHandle::spawn(guard.clone(), tenant, entity, deadline);
    let mut out = Vec::new();
    while let Some(chunk) = handle.next_chunk().await? {
        out.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8(out)?)
}

/// Data rows of an export with the generated columns (id, timestamps) removed.
fn stable_cells(csv_text: &str) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            let last = record.len() - 2;
            record.iter().skip(1).take(last - 1).map(str::to_owned).collect()
        })
        .collect()
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn tenants_do_not_see_each_other(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let (a, b) = (tenant(), tenant());

    let created = guard
        .run(a, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).create(&account("Acme")).await })
        })
        .await?;

    let seen_by_b = guard
        .run(b, move |scope| {
            Box::pin(async move {
                AccountRepo::new(scope)
                    .list(None, Pagination::from_raw(None, None, 20))
                    .await
            })
        })
        .await?;
    assert!(seen_by_b.is_empty());

    let id = created.id;
    let lookup = guard
        .run(b, move |scope| Box::pin(async move { AccountRepo::new(scope).get(id).await }))
        .await;
    assert!(matches!(lookup, Err(DbError::NotFound { .. })));

    assert!(!export_text(&guard, b, Entity::Accounts).await?.contains("Acme"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn failed_unit_rolls_back(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let t = tenant();

    let result: Result<(), DbError> = guard
        .run(t, move |scope| {
            Box::pin(async move {
                AccountRepo::new(scope).create(&account("Ghost")).await?;
                Err(DbError::NotFound {
                    resource: "account",
                    id: "forced".into(),
                })
            })
        })
        .await;
    assert!(result.is_err());

    assert!(!export_text(&guard, t, Entity::Accounts).await?.contains("Ghost"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn rollback_to_checkpoint_recovers_aborted_transaction(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let t = tenant();

    guard
        .run(t, move |scope| {
            Box::pin(async move {
                AccountRepo::new(scope).create(&account("Kept")).await?;

                let checkpoint = scope.checkpoint().await?;
                AccountRepo::new(scope).create(&account("Undone")).await?;
                let failed = sqlx::query("SELECT 1 / 0").execute(scope.executor()).await;
                assert!(failed.is_err());
                scope.rollback_to(checkpoint).await?;

                let nested = scope.checkpoint().await?;
                AccountRepo::new(scope).create(&account("After")).await?;
                scope.release(nested).await?;
                Ok(())
            })
        })
        .await?;

    let exported = export_text(&guard, t, Entity::Accounts).await?;
    assert!(exported.contains("Kept"));
    assert!(exported.contains("After"));
    assert!(!exported.contains("Undone"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn import_honours_its_deadline(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let t = tenant();
    let table = CsvTable::parse(format!("owner_user_id,name\n{OWNER},Late\n").as_bytes())?;

    let result = import(&guard, t, Entity::Accounts, table, tokio::time::Instant::now()).await;
    assert!(matches!(result, Err(DbError::DeadlineExceeded)));

    assert!(!export_text(&guard, t, Entity::Accounts).await?.contains("Late"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn mixed_validity_import_keeps_only_valid_rows(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let t = tenant();
    let csv = format!("owner_user_id,name,status\n{OWNER},Acme,active\nnot-a-uuid,Bad,active\n");

    let report = import_csv(&guard, t, Entity::Accounts, &csv).await?;
    assert_eq!(report.inserted, 1);
    assert_eq!(report.errors, vec!["row 3: invalid owner_user_id".to_owned()]);

    let exported = export_text(&guard, t, Entity::Accounts).await?;
    assert!(exported.contains("Acme"));
    assert!(!exported.contains("Bad"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn unknown_account_fails_only_its_row(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let (t, other) = (tenant(), tenant());

    let mine = guard
        .run(t, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).create(&account("Mine")).await })
        })
        .await?;
    let foreign = guard
        .run(other, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).create(&account("Theirs")).await })
        })
        .await?;

    let csv = format!(
        "account_id,owner_user_id,name\n{},{OWNER},Ghost\n{},{OWNER},Borrowed\n{},{OWNER},Real\n",
        Uuid::new_v4(),
        foreign.id,
        mine.id,
    );
    let report = import_csv(&guard, t, Entity::Opportunities, &csv).await?;

    assert_eq!(report.inserted, 1);
    assert_eq!(
        report.errors,
        vec![
            "row 2: account_id does not exist".to_owned(),
            "row 3: account_id does not exist".to_owned(),
        ]
    );

    let exported = export_text(&guard, t, Entity::Opportunities).await?;
    assert!(exported.contains("Real"));
    assert!(!exported.contains("Ghost"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn imported_next_action_is_listed(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let t = tenant();

    let acme = guard
        .run(t, move |scope| {
            Box::pin(async move { AccountRepo::new(scope).create(&account("Acme")).await })
        })
        .await?;

    let csv = format!(
        "account_id,owner_user_id,name,amount,next_action_at,next_action_note\n\
         {},{OWNER},Renewal,1234.5,2024-03-01T09:00:00Z,call back\n",
        acme.id
    );
    let report = import_csv(&guard, t, Entity::Opportunities, &csv).await?;
    assert_eq!(report.inserted, 1);
    assert!(report.errors.is_empty());

    let items = guard
        .run(t, move |scope| {
            Box::pin(async move {
                OpportunityRepo::new(scope)
                    .list_next_actions(None, Pagination::from_raw(None, None, 20))
                    .await
            })
        })
        .await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].account_name, "Acme");
    assert_eq!(items[0].next_action_note.as_deref(), Some("call back"));

    let exported = export_text(&guard, t, Entity::Opportunities).await?;
    assert!(exported.contains(",1234.50,"));
    assert!(exported.contains("2024-03-01T09:00:00Z"));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn next_action_on_missing_id_is_not_found(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let action = NextAction::parse("2024-03-01T09:00:00Z", "", "next_action_at")?;

    let result = guard
        .run(tenant(), move |scope| {
            Box::pin(async move {
                OpportunityRepo::new(scope)
                    .set_next_action(Uuid::new_v4(), &action)
                    .await
            })
        })
        .await;

    assert!(matches!(result, Err(DbError::NotFound { resource: "opportunity", .. })));
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn export_is_deterministic_and_round_trips(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let (source, target) = (tenant(), tenant());

    let csv = format!(
        "owner_user_id,name,industry,website,status,memo\n\
         {OWNER},Acme,Manufacturing,https://acme.test,active,\n\
         {OWNER},Globex,,,inactive,\"has, comma\"\n\
         {OWNER},Initech,Software,,,\n"
    );
    let report = import_csv(&guard, source, Entity::Accounts, &csv).await?;
    assert_eq!(report.inserted, 3);

    let first = export_text(&guard, source, Entity::Accounts).await?;
    let second = export_text(&guard, source, Entity::Accounts).await?;
    assert_eq!(first, second);

    let reimported = import_csv(&guard, target, Entity::Accounts, &first).await?;
    assert_eq!(reimported.inserted, 3);
    assert!(reimported.errors.is_empty());

    let copy = export_text(&guard, target, Entity::Accounts).await?;
    assert_eq!(stable_cells(&first), stable_cells(&copy));
    assert_eq!(stable_cells(&copy)[0][1], "Acme");
    Ok(())
}

#[sqlx::test(migrations = "../migrations")]
#[ignore = "requires database"]
async fn deadline_aborts_and_releases_connection(pool: PgPool) -> Result<()> {
    let guard = guard(pool);
    let t = tenant();

    let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
    let result = guard
        .run_until(t, deadline, move |scope| {
            Box::pin(async move {
                AccountRepo::new(scope).create(&account("Slow")).await?;
                sqlx::query("SELECT pg_sleep(5)")
                    .execute(scope.executor())
                    .await?;
                Ok(())
            })
        })
        .await;
    assert!(matches!(result, Err(DbError::DeadlineExceeded)));

    assert!(!export_text(&guard, t, Entity::Accounts).await?.contains("Slow"));
    Ok(())
}
