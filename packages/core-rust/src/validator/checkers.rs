//! Built-in type checkers. Each takes a non-blank raw value and returns the
//! coerced value or a validation failure.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use super::CheckError;
use super::locale::Messages;
use crate::checksum;
use crate::schema::ParamOpts;
use crate::types::{value_to_text, Params, Value};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d %B %Y", "%B %d, %Y"];

pub(super) fn boolean(value: &Value, m: &Messages) -> Result<Value, CheckError> {
    if let Value::Bool(b) = value {
        return Ok(Value::Bool(*b));
    }
    match value_to_text(value).as_str() {
        "true" | "1" | "on" => Ok(Value::Bool(true)),
        "false" | "0" | "off" => Ok(Value::Bool(false)),
        other => Err(CheckError::Invalid(m.unsupported_boolean(other))),
    }
}

/// Integer text must survive a parse and print round trip unchanged, so
/// `"12.5"`, `"012"` and `"1e3"` are rejected.
pub(super) fn integer(value: &Value, opts: &ParamOpts, m: &Messages) -> Result<Value, CheckError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(CheckError::Invalid(m.not_integer.to_string())),
    };

    let parsed: i64 = text
        .parse()
        .map_err(|_| CheckError::Invalid(m.not_integer.to_string()))?;
    if parsed.to_string() != text {
        return Err(CheckError::Invalid(m.not_integer.to_string()));
    }

    #[allow(clippy::cast_precision_loss)]
    check_bounds(parsed as f64, opts, m)?;
    Ok(Value::from(parsed))
}

pub(super) fn float(value: &Value, opts: &ParamOpts, m: &Messages) -> Result<Value, CheckError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
    .ok_or_else(|| CheckError::Invalid(m.bad_format.to_string()))?;

    let parsed = match opts.round {
        Some(places) => {
            let factor = 10f64.powi(i32::try_from(places.min(15)).unwrap_or(15));
            (parsed * factor).round() / factor
        }
        None => parsed,
    };

    check_bounds(parsed, opts, m)?;
    Ok(Value::from(parsed))
}

pub(super) fn string(value: &Value) -> Value {
    Value::String(value_to_text(value).trim().to_string())
}

pub(super) fn date(value: &Value, opts: &ParamOpts, m: &Messages) -> Result<Value, CheckError> {
    let day = parse_timestamp(value)
        .ok_or_else(|| CheckError::Invalid(m.bad_format.to_string()))?
        .date_naive();

    if let Some(min) = date_bound(opts.min.as_ref())? {
        let min = min.date_naive();
        if day < min {
            return Err(CheckError::Invalid(m.min_date(min)));
        }
    }
    if let Some(max) = date_bound(opts.max.as_ref())? {
        let max = max.date_naive();
        if day > max {
            return Err(CheckError::Invalid(m.max_date(max)));
        }
    }

    Ok(Value::String(day.format("%Y-%m-%d").to_string()))
}

pub(super) fn date_time(
    value: &Value,
    opts: &ParamOpts,
    m: &Messages,
) -> Result<Value, CheckError> {
    let at = parse_timestamp(value).ok_or_else(|| CheckError::Invalid(m.bad_format.to_string()))?;

    if let Some(min) = date_bound(opts.min.as_ref())? {
        if at < min {
            return Err(CheckError::Invalid(m.min_date(min.to_rfc3339())));
        }
    }
    if let Some(max) = date_bound(opts.max.as_ref())? {
        if at > max {
            return Err(CheckError::Invalid(m.max_date(max.to_rfc3339())));
        }
    }

    Ok(Value::String(at.to_rfc3339()))
}

pub(super) fn hash(value: &Value, opts: &ParamOpts) -> Value {
    let mut map = match value {
        Value::Object(map) => map.clone(),
        _ => Params::new(),
    };
    if let Some(allow) = &opts.allow {
        map.retain(|key, _| allow.iter().any(|a| a == key));
    }
    Value::Object(map)
}

pub(super) fn email(value: &Value, m: &Messages) -> Result<Value, CheckError> {
    let text = value_to_text(value);
    if text.chars().count() <= 7 {
        return Err(CheckError::Invalid(m.email_min.to_string()));
    }
    if !text.contains('@') {
        return Err(CheckError::Invalid(m.email_missing.to_string()));
    }
    Ok(Value::String(text.to_lowercase()))
}

pub(super) fn url(value: &Value, m: &Messages) -> Result<Value, CheckError> {
    let text = value_to_text(value);
    let rest = text
        .strip_prefix("https://")
        .or_else(|| text.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() => Ok(Value::String(text)),
        _ => Err(CheckError::Invalid(m.url_start.to_string())),
    }
}

/// `"lat,lng"`; each part needs a decimal point and more than five chars.
pub(super) fn point(value: &Value, m: &Messages) -> Result<Value, CheckError> {
    let parts: Vec<String> = match value {
        Value::Array(items) => items.iter().map(value_to_text).collect(),
        other => value_to_text(other)
            .split(',')
            .map(|p| p.trim().to_string())
            .collect(),
    };

    let well_formed = parts.len() == 2
        && parts
            .iter()
            .all(|p| p.contains('.') && p.chars().count() > 5);
    if !well_formed {
        return Err(CheckError::Invalid(m.point_format.to_string()));
    }
    Ok(Value::String(parts.join(",")))
}

pub(super) fn oib(value: &Value, m: &Messages) -> Result<Value, CheckError> {
    let text = value_to_text(value);
    let text = text.trim();
    if !checksum::is_oib_shaped(text) {
        return Err(CheckError::Invalid(m.bad_format.to_string()));
    }
    if !checksum::verify_oib(text) {
        return Err(CheckError::Invalid(m.wrong_checksum.to_string()));
    }
    text.parse::<i64>()
        .map(Value::from)
        .map_err(|_| CheckError::Invalid(m.bad_format.to_string()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn numeric_bound(bound: &Value) -> Result<f64, CheckError> {
    match bound {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| CheckError::Config(format!("numeric bound expected, got {bound}")))
}

fn check_bounds(value: f64, opts: &ParamOpts, m: &Messages) -> Result<(), CheckError> {
    if let Some(bound) = &opts.min {
        if value < numeric_bound(bound)? {
            return Err(CheckError::Invalid(m.min_value(value_to_text(bound))));
        }
    }
    if let Some(bound) = &opts.max {
        if value > numeric_bound(bound)? {
            return Err(CheckError::Invalid(m.max_value(value_to_text(bound))));
        }
    }
    Ok(())
}

fn date_bound(bound: Option<&Value>) -> Result<Option<DateTime<FixedOffset>>, CheckError> {
    bound
        .map(|b| {
            parse_timestamp(b)
                .ok_or_else(|| CheckError::Config(format!("date bound expected, got {b}")))
        })
        .transpose()
}

/// Accepts RFC 3339 timestamps, common naive date-time layouts (read as UTC)
/// and plain dates (midnight UTC).
fn parse_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    let Value::String(text) = value else {
        return None;
    };
    let text = text.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at);
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(text, fmt) {
            return day
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc().fixed_offset());
        }
    }
    None
}
