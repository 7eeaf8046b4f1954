//! sfa-server: tenant-scoped CRM data service
//!
//! Every read and write runs inside a [`TenantGuard`] unit of work that
//! binds the tenant to the database session. On top of that sit the bulk
//! CSV pipelines ([`bulk`]) and the axum HTTP surface ([`http`]).

pub mod bulk;
pub mod db;
pub mod http;
pub mod models;

pub use bulk::{Entity, ImportReport, EXPORT_VERSION};
pub use db::{create_lazy_pool, create_pool, DbError, PoolConfig, TenantGuard};
pub use http::{build_router, run_server, ServerConfig};
pub use models::TenantId;
