//! Route handlers organized by resource

pub mod health;
pub mod accounts;
pub mod opportunities;
pub mod integrations;
pub mod approvals;
pub mod bulk;

use serde::Serialize;

use crate::models::Pagination;

/// `{"data": ...}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{"data": [...], "meta": {"limit": n}}`
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub limit: u32,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>, page: Pagination) -> Self {
        Self {
            data,
            meta: ListMeta { limit: page.limit },
        }
    }
}

/// Borrow an optional JSON string as a raw cell; absent reads as `""`.
pub(crate) fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Accept a JSON string or number for a field that is parsed from text.
pub(crate) fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde::Deserialize;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}
