//! Account input validation

use uuid::Uuid;

use super::vocab::{AccountStatus, DefaultOnCreate};
use super::{wire, ValidationError};

/// Maximum length for account names
const MAX_NAME_LEN: usize = 256;

/// Unvalidated account fields as they arrive on the wire.
///
/// Missing cells or JSON members are represented by `""`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawAccount<'a> {
    pub owner_user_id: &'a str,
    pub name: &'a str,
    pub industry: &'a str,
    pub website: &'a str,
    pub phone: &'a str,
    pub status: &'a str,
    pub memo: &'a str,
}

impl<'a> RawAccount<'a> {
    /// Required fields that are blank, in column order.
    pub fn missing(&self) -> Vec<&'static str> {
        [("owner_user_id", self.owner_user_id), ("name", self.name)]
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect()
    }
}

/// Validated account ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub owner_user_id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub memo: Option<String>,
}

impl NewAccount {
    /// Validate raw fields.
    ///
    /// An empty status means `prospect`; any other unknown value is an error.
    pub fn parse(raw: RawAccount<'_>) -> Result<Self, ValidationError> {
        let owner_user_id = wire::parse_uuid(raw.owner_user_id, "owner_user_id")?;
        let name = wire::required_text(raw.name, "name")?;
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }
        let status = AccountStatus::parse_or_default(raw.status)?;

        Ok(Self {
            owner_user_id,
            name,
            industry: wire::text(raw.industry),
            website: wire::text(raw.website),
            phone: wire::text(raw.phone),
            status,
            memo: wire::text(raw.memo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "11111111-1111-1111-1111-111111111111";

    #[test]
    fn minimal_account_gets_defaults() {
        let account = NewAccount::parse(RawAccount {
            owner_user_id: OWNER,
            name: "Acme",
            ..Default::default()
        })
        .unwrap();

        assert_eq!(account.status, AccountStatus::Prospect);
        assert_eq!(account.industry, None);
        assert_eq!(account.memo, None);
    }

    #[test]
    fn missing_lists_blank_required_fields() {
        let raw = RawAccount {
            name: " ",
            ..Default::default()
        };
        assert_eq!(raw.missing(), vec!["owner_user_id", "name"]);
    }

    #[test]
    fn bad_owner_names_the_field() {
        let err = NewAccount::parse(RawAccount {
            owner_user_id: "not-a-uuid",
            name: "Bad",
            status: "active",
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field(), "owner_user_id");
    }

    #[test]
    fn bogus_status_is_rejected() {
        let err = NewAccount::parse(RawAccount {
            owner_user_id: OWNER,
            name: "Acme",
            status: "bogus",
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field(), "status");
    }

    #[test]
    fn overlong_name() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        let err = NewAccount::parse(RawAccount {
            owner_user_id: OWNER,
            name: &name,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 256, .. }));
    }
}
