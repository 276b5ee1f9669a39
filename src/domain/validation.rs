//! Request field validation
//!
//! Wire DTOs keep every field optional so that a missing field becomes a
//! 400 with a message naming it, instead of an extractor rejection.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};

use super::DomainError;

/// Require a non-blank string, returning it trimmed
pub fn require(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(DomainError::MissingField(field)),
    }
}

/// Trim an optional string, treating blank as absent
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DomainError::invalid(field, "formato esperado AAAA-MM-DD"))
}

/// Parse a time of day in `HH:MM` or `HH:MM:SS` form
pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| DomainError::invalid(field, "formato esperado HH:MM"))
}

/// Require a coordinate within `[-limit, limit]`
pub fn require_coordinate(
    field: &'static str,
    value: Option<f64>,
    limit: f64,
) -> Result<f64, DomainError> {
    let value = value.ok_or(DomainError::MissingField(field))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(DomainError::invalid(
            field,
            format!("fora do intervalo [-{limit}, {limit}]"),
        ));
    }
    Ok(value)
}

/// Deserialize an identifier that clients send either as a string or a number.
///
/// Badge numbers, vehicle and route ids arrive as `"18001"` or `18001`
/// depending on the client; both become the same string.
pub fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}
