//! Repository implementations for database access
//!
//! Each repository borrows a [`TenantScope`](crate::db::TenantScope) and
//! follows these patterns:
//! - Every statement filters or stamps the scope's tenant
//! - Single-row updates report `NotFound` instead of succeeding silently
//! - Conflicts handled via ON CONFLICT (no check-then-insert)

pub mod accounts;
pub mod opportunities;
pub mod integrations;
pub mod approvals;

pub use accounts::{Account, AccountRepo};
pub use opportunities::{NextActionItem, Opportunity, OpportunityRepo};
pub use integrations::{IntegrationConnection, IntegrationEvent, IntegrationRepo};
pub use approvals::{ApprovalRequest, ApprovalRepo};
