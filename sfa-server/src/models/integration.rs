//! Integration connection and event inputs

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::vocab::{IntegrationProvider, IntegrationStatus, IntegrationType, Vocabulary};
use super::{wire, ValidationError};

/// Validated connection upsert.
///
/// `status: None` keeps the stored value on update and defaults to `active`
/// on insert.
#[derive(Debug, Clone)]
pub struct ConnectionUpsert {
    pub user_id: Uuid,
    pub provider: IntegrationProvider,
    pub integration_type: IntegrationType,
    pub external_account_id: String,
    pub status: Option<IntegrationStatus>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawConnection<'a> {
    pub user_id: &'a str,
    pub provider: &'a str,
    pub integration_type: &'a str,
    pub external_account_id: &'a str,
    pub status: &'a str,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
    pub expires_at: &'a str,
    pub scopes: Vec<String>,
}

impl ConnectionUpsert {
    pub fn parse(raw: RawConnection<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id: wire::parse_uuid(raw.user_id, "userId")?,
            provider: IntegrationProvider::parse(raw.provider)?,
            integration_type: IntegrationType::parse(raw.integration_type)?,
            external_account_id: wire::required_text(raw.external_account_id, "externalAccountId")?,
            status: IntegrationStatus::parse_optional(raw.status)?,
            access_token: wire::text(raw.access_token),
            refresh_token: wire::text(raw.refresh_token),
            expires_at: wire::parse_optional_timestamp(raw.expires_at, "expiresAt")?,
            scopes: raw
                .scopes
                .into_iter()
                .filter_map(|s| wire::text(&s))
                .collect(),
        })
    }
}

/// Validated integration event.
#[derive(Debug, Clone)]
pub struct NewIntegrationEvent {
    pub provider: IntegrationProvider,
    pub integration_type: IntegrationType,
    pub external_event_id: Option<String>,
    pub event_type: String,
    pub payload: JsonValue,
    pub linked_account_id: Option<Uuid>,
    pub linked_contact_id: Option<Uuid>,
    pub linked_opportunity_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RawIntegrationEvent<'a> {
    pub provider: &'a str,
    pub integration_type: &'a str,
    pub external_event_id: &'a str,
    pub event_type: &'a str,
    pub payload: Option<JsonValue>,
    pub linked_account_id: &'a str,
    pub linked_contact_id: &'a str,
    pub linked_opportunity_id: &'a str,
    pub occurred_at: &'a str,
}

impl NewIntegrationEvent {
    pub fn parse(raw: RawIntegrationEvent<'_>) -> Result<Self, ValidationError> {
        if raw.occurred_at.trim().is_empty() {
            return Err(ValidationError::Empty { field: "occurredAt" });
        }

        let payload = match raw.payload {
            None | Some(JsonValue::Null) => JsonValue::Object(Default::default()),
            Some(obj @ JsonValue::Object(_)) => obj,
            Some(_) => {
                return Err(ValidationError::InvalidFormat {
                    field: "payload",
                    reason: "must be a JSON object",
                })
            }
        };

        Ok(Self {
            provider: IntegrationProvider::parse(raw.provider)?,
            integration_type: IntegrationType::parse(raw.integration_type)?,
            external_event_id: wire::text(raw.external_event_id),
            event_type: wire::required_text(raw.event_type, "eventType")?,
            payload,
            linked_account_id: wire::parse_optional_uuid(raw.linked_account_id, "linkedAccountId")?,
            linked_contact_id: wire::parse_optional_uuid(raw.linked_contact_id, "linkedContactId")?,
            linked_opportunity_id: wire::parse_optional_uuid(
                raw.linked_opportunity_id,
                "linkedOpportunityId",
            )?,
            occurred_at: wire::parse_timestamp(raw.occurred_at, "occurredAt")?,
        })
    }
}
