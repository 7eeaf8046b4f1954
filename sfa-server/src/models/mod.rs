//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod tenant;
pub mod vocab;
pub mod wire;
pub mod account;
pub mod opportunity;
pub mod integration;
pub mod approval;
pub mod pagination;

pub use validation::ValidationError;
pub use tenant::{TenantError, TenantId};
pub use vocab::{
    AccountStatus, ApprovalStatus, DefaultOnCreate, IntegrationProvider, IntegrationStatus,
    IntegrationType, OpportunityStage, Vocabulary,
};
pub use account::{NewAccount, RawAccount};
pub use opportunity::{NewOpportunity, NextAction, RawOpportunity};
pub use integration::{ConnectionUpsert, NewIntegrationEvent, RawConnection, RawIntegrationEvent};
pub use approval::{ApprovalDecision, NewApprovalRequest, RawApprovalRequest};
pub use pagination::{Pagination, PaginationParams};
