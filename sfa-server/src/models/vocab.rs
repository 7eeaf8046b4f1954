//! Closed vocabularies for enumerated fields
//!
//! Each enum maps 1:1 onto a PostgreSQL enum type. `as_str` is the single
//! source of truth for the wire spelling; parsing walks `ALL` and compares
//! against it, so the two directions cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// A closed set of wire values.
pub trait Vocabulary: Copy + Eq + Sized + 'static {
    /// Wire name of the field this vocabulary populates.
    const FIELD: &'static str;

    /// Human-readable list of accepted values.
    const EXPECTED: &'static str;

    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    /// Parse a value (case-insensitive, surrounding whitespace ignored).
    ///
    /// Unknown values are rejected, never coerced.
    fn parse(raw: &str) -> Result<Self, ValidationError> {
        let needle = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: Self::FIELD,
                value: needle.to_owned(),
                expected: Self::EXPECTED,
            })
    }

    /// Parse an optional value; empty input means absent.
    fn parse_optional(raw: &str) -> Result<Option<Self>, ValidationError> {
        if raw.trim().is_empty() {
            Ok(None)
        } else {
            Self::parse(raw).map(Some)
        }
    }
}

/// Vocabularies with a documented value applied when creation input is empty.
pub trait DefaultOnCreate: Vocabulary {
    const ON_CREATE: Self;

    /// Empty input yields [`Self::ON_CREATE`]; anything else must parse.
    fn parse_or_default(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            Ok(Self::ON_CREATE)
        } else {
            Self::parse(raw)
        }
    }
}

macro_rules! impl_display {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
pub enum AccountStatus {
    Prospect,
    Active,
    Inactive,
}

impl Vocabulary for AccountStatus {
    const FIELD: &'static str = "status";
    const EXPECTED: &'static str = "prospect, active, inactive";
    const ALL: &'static [Self] = &[Self::Prospect, Self::Active, Self::Inactive];

    fn as_str(self) -> &'static str {
        match self {
            Self::Prospect => "prospect",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl DefaultOnCreate for AccountStatus {
    const ON_CREATE: Self = Self::Prospect;
}

/// Sales pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "opportunity_stage", rename_all = "snake_case")]
pub enum OpportunityStage {
    NewLead,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Vocabulary for OpportunityStage {
    const FIELD: &'static str = "stage";
    const EXPECTED: &'static str =
        "new_lead, qualified, proposal, negotiation, closed_won, closed_lost";
    const ALL: &'static [Self] = &[
        Self::NewLead,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::NewLead => "new_lead",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }
}

impl DefaultOnCreate for OpportunityStage {
    const ON_CREATE: Self = Self::NewLead;
}

/// External integration provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "integration_provider", rename_all = "snake_case")]
pub enum IntegrationProvider {
    Google,
    Microsoft,
}

impl Vocabulary for IntegrationProvider {
    const FIELD: &'static str = "provider";
    const EXPECTED: &'static str = "google, microsoft";
    const ALL: &'static [Self] = &[Self::Google, Self::Microsoft];

    fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
        }
    }
}

/// Kind of data an integration syncs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "integration_type", rename_all = "snake_case")]
pub enum IntegrationType {
    Email,
    Calendar,
}

impl Vocabulary for IntegrationType {
    const FIELD: &'static str = "integrationType";
    const EXPECTED: &'static str = "email, calendar";
    const ALL: &'static [Self] = &[Self::Email, Self::Calendar];

    fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Calendar => "calendar",
        }
    }
}

/// Health of an integration connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "integration_status", rename_all = "snake_case")]
pub enum IntegrationStatus {
    Active,
    Revoked,
    Error,
}

impl Vocabulary for IntegrationStatus {
    const FIELD: &'static str = "status";
    const EXPECTED: &'static str = "active, revoked, error";
    const ALL: &'static [Self] = &[Self::Active, Self::Revoked, Self::Error];

    fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Error => "error",
        }
    }
}

impl DefaultOnCreate for IntegrationStatus {
    const ON_CREATE: Self = Self::Active;
}

/// Approval workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl Vocabulary for ApprovalStatus {
    const FIELD: &'static str = "status";
    const EXPECTED: &'static str = "pending, approved, rejected";
    const ALL: &'static [Self] = &[Self::Pending, Self::Approved, Self::Rejected];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl_display!(
    AccountStatus,
    OpportunityStage,
    IntegrationProvider,
    IntegrationType,
    IntegrationStatus,
    ApprovalStatus
);
