//! Tenant identity
//!
//! A `TenantId` can only be obtained by parsing, so holding one proves the
//! identifier was well-formed before any storage was touched.

use std::fmt;

use uuid::Uuid;

/// Error raised for a missing or malformed tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantError {
    #[error("X-Tenant-ID header is required")]
    Missing,

    #[error("X-Tenant-ID must be a valid UUID")]
    Malformed,
}

/// Opaque 128-bit tenant identifier; the isolation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Parse a tenant identifier.
    ///
    /// Whitespace around the value is ignored. The nil UUID is rejected.
    pub fn parse(raw: &str) -> Result<Self, TenantError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TenantError::Missing);
        }

        match Uuid::parse_str(raw) {
            Ok(id) if !id.is_nil() => Ok(Self(id)),
            _ => Err(TenantError::Malformed),
        }
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uuid() {
        let id = TenantId::parse(" 11111111-1111-1111-1111-111111111111 ").unwrap();
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(TenantId::parse(""), Err(TenantError::Missing));
        assert_eq!(TenantId::parse("   "), Err(TenantError::Missing));
    }

    #[test]
    fn rejects_garbage_and_nil() {
        assert_eq!(TenantId::parse("acme"), Err(TenantError::Malformed));
        assert_eq!(
            TenantId::parse("00000000-0000-0000-0000-000000000000"),
            Err(TenantError::Malformed)
        );
    }
}
