//! Approval request inputs

use uuid::Uuid;

use super::vocab::{ApprovalStatus, Vocabulary};
use super::{wire, ValidationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct RawApprovalRequest<'a> {
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub requested_by: &'a str,
    pub approver_user_id: &'a str,
    pub reason: &'a str,
}

/// Validated approval request; always created as `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApprovalRequest {
    pub entity_type: String,
    pub entity_id: Uuid,
    pub requested_by: Uuid,
    pub approver_user_id: Uuid,
    pub reason: String,
}

impl NewApprovalRequest {
    pub fn parse(raw: RawApprovalRequest<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            entity_type: wire::required_text(raw.entity_type, "entityType")?,
            entity_id: wire::parse_uuid(raw.entity_id, "entityId")?,
            requested_by: wire::parse_uuid(raw.requested_by, "requestedBy")?,
            approver_user_id: wire::parse_uuid(raw.approver_user_id, "approverUserId")?,
            reason: wire::required_text(raw.reason, "reason")?,
        })
    }
}

/// Outcome recorded against an approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub status: ApprovalStatus,
    pub note: Option<String>,
}

impl ApprovalDecision {
    pub fn parse(status: &str, note: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            status: ApprovalStatus::parse(status)?,
            note: wire::text(note),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_ids() {
        let err = NewApprovalRequest::parse(RawApprovalRequest {
            entity_type: "opportunity",
            entity_id: "44444444-4444-4444-4444-444444444444",
            requested_by: "nobody",
            approver_user_id: "55555555-5555-5555-5555-555555555555",
            reason: "discount above 20%",
        })
        .unwrap_err();
        assert_eq!(err.code(), "invalid_requested_by");
    }

    #[test]
    fn decision_vocabulary() {
        let d = ApprovalDecision::parse("Approved", "").unwrap();
        assert_eq!(d.status, ApprovalStatus::Approved);
        assert_eq!(d.note, None);
        assert!(ApprovalDecision::parse("maybe", "").is_err());
    }
}
