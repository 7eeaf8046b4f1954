//! Validation error types

use std::fmt;

/// Validation error for boundary input.
///
/// `field` is always the wire name (`owner_user_id`, `nextActionAt`, ...),
/// so the same value can be echoed back in error codes and row diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., UUID, timestamp)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Value outside of a closed vocabulary
    InvalidVariant {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Numeric value outside the accepted range
    OutOfRange { field: &'static str, reason: &'static str },
}

impl ValidationError {
    /// Wire name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::InvalidVariant { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }

    /// Machine-readable error code, e.g. `invalid_stage` or `missing_name`.
    pub fn code(&self) -> String {
        let field = to_snake_case(self.field());
        match self {
            Self::Empty { .. } => format!("missing_{}", field),
            _ => format!("invalid_{}", field),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant {
                field,
                value,
                expected,
            } => {
                write!(f, "invalid {} value '{}': expected {}", field, value, expected)
            }
            Self::OutOfRange { field, reason } => write!(f, "{}: {}", field, reason),
        }
    }
}

impl std::error::Error for ValidationError {}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
