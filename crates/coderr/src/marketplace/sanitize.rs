//! Input coercion shared by offer creation, offer updates and repairs.
//!
//! Clients send loosely typed JSON (numbers as strings, nulls, missing keys).
//! These helpers turn any of that into values that satisfy the stored
//! invariants, so no API response ever carries a null tier field.

use serde_json::Value;

pub const UNLIMITED_REVISIONS: i32 = -1;

/// Largest storable price: ten digits, two of them decimals.
pub const MAX_PRICE: f64 = 99_999_999.99;

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

fn as_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_float(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// `-1` (unlimited) survives, everything else is at least one revision.
pub fn revisions(value: Option<&Value>) -> i32 {
    as_integer(value).map(clamp_revisions).unwrap_or(1)
}

pub fn clamp_revisions(n: i64) -> i32 {
    if n == i64::from(UNLIMITED_REVISIONS) {
        UNLIMITED_REVISIONS
    } else {
        n.clamp(1, i64::from(i32::MAX)) as i32
    }
}

pub fn delivery_time(value: Option<&Value>) -> u32 {
    as_integer(value)
        .map(|n| n.clamp(1, i64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

pub fn price(value: Option<&Value>) -> f64 {
    as_float(value).map(clamp_price).unwrap_or(0.0)
}

/// Non-negative, finite, at most [`MAX_PRICE`], two decimal places.
pub fn clamp_price(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }
    (raw.min(MAX_PRICE) * 100.0).round() / 100.0
}

pub fn title(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(raw)) => raw.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

/// Keeps trimmed, non-blank strings; anything that is not a list yields none.
pub fn features(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// `None` for empty references, an error message for unsupported formats.
pub fn image(raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let lower = raw.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        Ok(Some(raw.to_string()))
    } else {
        Err("unsupported image format, use JPEG, PNG, GIF or WebP".to_string())
    }
}

/// One-decimal rounding used for the average rating.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
