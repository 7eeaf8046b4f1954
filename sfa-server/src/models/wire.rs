//! Wire mapping for nullable and typed scalar fields
//!
//! Absence is always `Option::None` internally. On the CSV side `None`
//! renders as an empty cell and an empty cell parses back to `None`; JSON
//! responses carry `null`. Creation-time defaults (amount 0, probability 0)
//! are applied here so both the import pipeline and single-entity endpoints
//! agree on them.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Signed, Zero};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use super::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest amount accepted by `NUMERIC(14, 2)`, exclusive.
const AMOUNT_CEILING: i64 = 1_000_000_000_000;

/// Fractional digits kept for amounts.
const AMOUNT_SCALE: i64 = 2;

/// Optional free text: blank means absent.
pub fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Same as [`text`] for values that arrive already optional (JSON bodies).
pub fn opt_text(raw: Option<String>) -> Option<String> {
    raw.as_deref().and_then(text)
}

/// Required free text.
pub fn required_text(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    text(raw).ok_or(ValidationError::Empty { field })
}

pub fn parse_uuid(raw: &str, field: &'static str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be a UUID",
    })
}

pub fn parse_optional_uuid(raw: &str, field: &'static str) -> Result<Option<Uuid>, ValidationError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_uuid(raw, field).map(Some)
    }
}

/// Accepts RFC 3339 with offset, or a bare `YYYY-MM-DD` read as UTC midnight.
pub fn parse_timestamp(raw: &str, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(ValidationError::InvalidFormat {
        field,
        reason: "must be RFC3339 or YYYY-MM-DD",
    })
}

pub fn parse_optional_timestamp(
    raw: &str,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_timestamp(raw, field).map(Some)
    }
}

pub fn parse_optional_date(raw: &str, field: &'static str) -> Result<Option<NaiveDate>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidFormat {
            field,
            reason: "must be YYYY-MM-DD",
        })
}

/// Non-negative decimal rounded half-up to two fractional digits, the way
/// `NUMERIC(14, 2)` stores it. Empty input is the creation default of zero.
pub fn parse_amount(raw: &str, field: &'static str) -> Result<BigDecimal, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(BigDecimal::zero());
    }

    let value = BigDecimal::from_str(raw).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be a decimal number",
    })?;

    if value.is_negative() {
        return Err(ValidationError::OutOfRange {
            field,
            reason: "must not be negative",
        });
    }
    let value = value.with_scale_round(AMOUNT_SCALE, RoundingMode::HalfUp);
    if value >= BigDecimal::from(AMOUNT_CEILING) {
        return Err(ValidationError::OutOfRange {
            field,
            reason: "exceeds 12 integer digits",
        });
    }

    Ok(value)
}

/// Integer percentage in `0..=100`. Empty input is the creation default of zero.
pub fn parse_probability(raw: &str, field: &'static str) -> Result<i16, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }

    let value: i16 = raw.parse().map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be an integer",
    })?;

    if !(0..=100).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            reason: "must be between 0 and 100",
        });
    }
    Ok(value)
}

/// Always exactly two fractional digits, zero included.
pub fn render_amount(value: &BigDecimal) -> String {
    let (digits, _) = value
        .with_scale_round(AMOUNT_SCALE, RoundingMode::HalfUp)
        .into_bigint_and_exponent();
    let magnitude = digits.magnitude().to_string();
    let padded = format!("{magnitude:0>3}");
    let (whole, cents) = padded.split_at(padded.len() - 2);
    let sign = if digits.is_negative() { "-" } else { "" };
    format!("{sign}{whole}.{cents}")
}

/// JSON form of an amount: the same two-digit string as the CSV cell.
pub fn serialize_amount<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&render_amount(value))
}

pub fn render_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Fixed UTC profile: second precision, `Z` suffix.
pub fn render_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn render_optional_text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_owned()
}

pub fn render_optional_uuid(value: Option<Uuid>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render_optional_date(value: Option<NaiveDate>) -> String {
    value.map(render_date).unwrap_or_default()
}

pub fn render_optional_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(render_timestamp).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(text(""), None);
        assert_eq!(text("   "), None);
        assert_eq!(text(" Retail "), Some("Retail".to_owned()));
        assert_eq!(opt_text(Some(String::new())), None);
        assert_eq!(opt_text(None), None);
    }

    #[test]
    fn absent_renders_empty() {
        assert_eq!(render_optional_text(None), "");
        assert_eq!(render_optional_uuid(None), "");
        assert_eq!(render_optional_date(None), "");
        assert_eq!(render_optional_timestamp(None), "");
    }

    #[test]
    fn timestamp_accepts_rfc3339_and_bare_date() {
        let ts = parse_timestamp("2024-05-01T18:30:00+09:00", "nextActionAt").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());

        let ts = parse_timestamp("2024-05-01", "dueBefore").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());

        let err = parse_timestamp("01/05/2024", "dueBefore").unwrap_err();
        assert_eq!(err.code(), "invalid_due_before");
    }

    #[test]
    fn timestamp_renders_in_utc() {
        let ts = parse_timestamp("2024-05-01T18:30:00.750+09:00", "at").unwrap();
        assert_eq!(render_timestamp(ts), "2024-05-01T09:30:00Z");
    }

    #[test]
    fn dates_render_without_time() {
        let date = parse_optional_date("2024-12-31", "expected_close_date").unwrap();
        assert_eq!(render_optional_date(date), "2024-12-31");
        assert!(parse_optional_date("2024-12-31T00:00:00Z", "expected_close_date").is_err());
    }

    #[test]
    fn amount_renders_two_fraction_digits() {
        let amount = parse_amount("1234.5", "amount").unwrap();
        assert_eq!(render_amount(&amount), "1234.50");
        assert_eq!(render_amount(&parse_amount("", "amount").unwrap()), "0.00");
        assert_eq!(render_amount(&BigDecimal::from(7)), "7.00");
        assert_eq!(render_amount(&BigDecimal::zero()), "0.00");
        assert_eq!(render_amount(&BigDecimal::new(0.into(), 2)), "0.00");
        assert_eq!(render_amount(&BigDecimal::from_str("0.05").unwrap()), "0.05");
        assert_eq!(render_amount(&BigDecimal::from_str("999999999999.99").unwrap()), "999999999999.99");
    }

    #[test]
    fn amount_serializes_as_two_digit_string() {
        #[derive(serde::Serialize)]
        struct Row {
            #[serde(serialize_with = "serialize_amount")]
            amount: BigDecimal,
        }

        let json = serde_json::to_value(Row { amount: BigDecimal::zero() }).unwrap();
        assert_eq!(json["amount"], "0.00");
    }

    #[test]
    fn amount_rounds_half_up() {
        let render = |raw: &str| render_amount(&parse_amount(raw, "amount").unwrap());
        assert_eq!(render("12.345"), "12.35");
        assert_eq!(render("0.005"), "0.01");
        assert_eq!(render("0.001"), "0.00");
        assert_eq!(render("2.675"), "2.68");
        assert!(parse_amount("999999999999.995", "amount").is_err());
    }

    #[test]
    fn amount_rejects_negative_and_garbage() {
        assert!(matches!(
            parse_amount("-1", "amount"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_amount("ten", "amount"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(parse_amount("1000000000000", "amount").is_err());
    }

    #[test]
    fn probability_bounds() {
        assert_eq!(parse_probability("", "probability").unwrap(), 0);
        assert_eq!(parse_probability("100", "probability").unwrap(), 100);
        assert!(parse_probability("101", "probability").is_err());
        assert!(parse_probability("-1", "probability").is_err());
        assert!(parse_probability("50.5", "probability").is_err());
    }

    #[test]
    fn optional_uuid() {
        assert_eq!(parse_optional_uuid(" ", "contact_id").unwrap(), None);
        assert!(parse_optional_uuid("nope", "contact_id").is_err());
        let err = parse_uuid("not-a-uuid", "owner_user_id").unwrap_err();
        assert_eq!(err.field(), "owner_user_id");
    }
}
