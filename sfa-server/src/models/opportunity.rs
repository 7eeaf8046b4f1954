//! Opportunity input validation

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::vocab::{DefaultOnCreate, OpportunityStage};
use super::{wire, ValidationError};

/// Maximum length for opportunity names
const MAX_NAME_LEN: usize = 256;

/// Unvalidated opportunity fields; blank means absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawOpportunity<'a> {
    pub account_id: &'a str,
    pub contact_id: &'a str,
    pub owner_user_id: &'a str,
    pub name: &'a str,
    pub stage: &'a str,
    pub probability: &'a str,
    pub amount: &'a str,
    pub expected_close_date: &'a str,
    pub next_action_at: &'a str,
    pub next_action_note: &'a str,
}

impl<'a> RawOpportunity<'a> {
    /// Required fields that are blank, in column order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("account_id", self.account_id),
            ("owner_user_id", self.owner_user_id),
            ("name", self.name),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

/// Scheduled follow-up on an opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextAction {
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

impl NextAction {
    /// Parse a next action; `at` is required.
    pub fn parse(at: &str, note: &str, at_field: &'static str) -> Result<Self, ValidationError> {
        if at.trim().is_empty() {
            return Err(ValidationError::Empty { field: at_field });
        }
        Ok(Self {
            at: wire::parse_timestamp(at, at_field)?,
            note: wire::text(note),
        })
    }
}

/// Validated opportunity ready for insertion.
///
/// `next_action` is applied by a separate update after the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOpportunity {
    pub account_id: Uuid,
    pub contact_id: Option<Uuid>,
    pub owner_user_id: Uuid,
    pub name: String,
    pub stage: OpportunityStage,
    pub probability: i16,
    pub amount: BigDecimal,
    pub expected_close_date: Option<NaiveDate>,
    pub next_action: Option<NextAction>,
}

impl NewOpportunity {
    pub fn parse(raw: RawOpportunity<'_>) -> Result<Self, ValidationError> {
        let account_id = wire::parse_uuid(raw.account_id, "account_id")?;
        let owner_user_id = wire::parse_uuid(raw.owner_user_id, "owner_user_id")?;
        let contact_id = wire::parse_optional_uuid(raw.contact_id, "contact_id")?;
        let name = wire::required_text(raw.name, "name")?;
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }

        let stage = OpportunityStage::parse_or_default(raw.stage)?;
        let probability = wire::parse_probability(raw.probability, "probability")?;
        let amount = wire::parse_amount(raw.amount, "amount")?;
        let expected_close_date =
            wire::parse_optional_date(raw.expected_close_date, "expected_close_date")?;

        let next_action = if raw.next_action_at.trim().is_empty() {
            None
        } else {
            Some(NextAction::parse(
                raw.next_action_at,
                raw.next_action_note,
                "next_action_at",
            )?)
        };

        Ok(Self {
            account_id,
            contact_id,
            owner_user_id,
            name,
            stage,
            probability,
            amount,
            expected_close_date,
            next_action,
        })
    }
}
