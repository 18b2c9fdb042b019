//! Extraction and validation of the model's JSON reply.

use serde_json::Value;

use super::EstimationResult;
use crate::error::EstimationError;

/// Characters of the offending text kept in a `MalformedResponse` error.
const EXCERPT_CHARS: usize = 200;

/// Strip a surrounding markdown code fence, with or without a language tag.
///
/// Text that is not fenced is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(idx) if is_fence_tag(&rest[..idx]) => &rest[idx + 1..],
        Some(_) => rest,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn is_fence_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse `raw` into an [`EstimationResult`] holding exactly `expected_fields`.
///
/// Every expected field must be a non-negative JSON number; values are
/// rounded to the nearest integer, halves rounding up.
pub fn parse_response(
    raw: &str,
    expected_fields: &[&'static str],
) -> Result<EstimationResult, EstimationError> {
    let json_text = strip_code_fence(raw);

    let value: Value =
        serde_json::from_str(json_text).map_err(|e| malformed(e.to_string(), json_text))?;
    let Value::Object(object) = value else {
        return Err(malformed("expected a JSON object", json_text));
    };

    let mut result = EstimationResult::default();
    for &field in expected_fields {
        let number = match object.get(field) {
            None | Some(Value::Null) => return Err(invalid(field, "missing")),
            Some(Value::Number(n)) => n,
            Some(other) => {
                return Err(invalid(
                    field,
                    format!("expected a number, got {}", json_type(other)),
                ));
            }
        };
        result.insert(field, to_whole(field, number)?);
    }

    Ok(result)
}

/// Exclusive upper bound of `i64` as an `f64` (2^63).
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Convert a JSON number to a non-negative whole number.
///
/// Integers are taken exactly; fractions are rounded half up.
fn to_whole(field: &str, number: &serde_json::Number) -> Result<i64, EstimationError> {
    if let Some(int) = number.as_i64() {
        return if int < 0 {
            Err(invalid(field, "must not be negative"))
        } else {
            Ok(int)
        };
    }
    if number.is_u64() {
        return Err(invalid(field, "out of range"));
    }

    let value = number.as_f64().ok_or_else(|| invalid(field, "not finite"))?;
    if value < 0.0 {
        return Err(invalid(field, "must not be negative"));
    }
    round_half_up(value).ok_or_else(|| invalid(field, "out of range"))
}

/// `None` when the rounded value does not fit in `i64`.
fn round_half_up(value: f64) -> Option<i64> {
    let rounded = value.round();
    (rounded.is_finite() && rounded < I64_BOUND).then_some(rounded as i64)
}

fn malformed(reason: impl Into<String>, text: &str) -> EstimationError {
    EstimationError::MalformedResponse {
        reason: reason.into(),
        excerpt: text.chars().take(EXCERPT_CHARS).collect(),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> EstimationError {
    EstimationError::InvalidResponseShape {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
