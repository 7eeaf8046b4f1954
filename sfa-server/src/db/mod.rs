//! Database layer - connection pool, tenant guard and repositories
//!
//! # Design Principles
//!
//! - Explicit pool handle threaded into the guard - no global connection
//! - Every unit of work is one tenant-bound transaction
//! - Repositories exist only inside a guard scope
//! - Rely on DB constraints, handle conflicts - no check-then-insert

pub mod error;
pub mod pool;
pub mod repos;
pub mod tenant;

pub use error::DbError;
pub use pool::{
    create_lazy_pool, create_pool, run_migrations, PoolConfig, DEFAULT_DATABASE_URL, MIGRATOR,
};
pub use repos::*;
pub use tenant::{Checkpoint, TenantGuard, TenantScope};
