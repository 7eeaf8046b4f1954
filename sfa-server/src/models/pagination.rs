//! Pagination parameters for list endpoints

use serde::Deserialize;

/// Hard ceiling for `limit`; larger requests fall back to the default.
pub const MAX_LIMIT: u32 = 200;

/// Default items per page
pub const DEFAULT_LIMIT: u32 = 20;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (1..=200)
    pub limit: u32,
}

impl Pagination {
    /// Build pagination from raw query values.
    ///
    /// Anything that is missing, non-numeric, zero or negative falls back to
    /// the default; a limit above [`MAX_LIMIT`] also falls back to
    /// `default_limit` rather than being clamped.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Self {
        let page = page.and_then(parse_positive).unwrap_or(1);
        let limit = limit
            .and_then(parse_positive)
            .filter(|l| *l <= MAX_LIMIT)
            .unwrap_or(default_limit);

        Self { page, limit }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        if self.page <= 1 {
            0
        } else {
            (i64::from(self.page) - 1) * i64::from(self.limit)
        }
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

/// Query parameters for pagination.
///
/// Kept as strings so a malformed value degrades to the default instead of
/// rejecting the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl From<&PaginationParams> for Pagination {
    fn from(params: &PaginationParams) -> Self {
        Self::from_raw(params.page.as_deref(), params.limit.as_deref(), DEFAULT_LIMIT)
    }
}
