//! Reduces a raw source payload to the single authoritative row for a currency.

use super::error::RateError;
use super::rate::RateRow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Selects the most recent valid row for `currency` from `payload`.
///
/// Returns `Ok(None)` when the payload is not a non-empty array or no record
/// survives validation. A record that matches the currency but carries an
/// unparsable date or value fails the whole selection.
///
/// When several rows share the latest date, the first one encountered wins.
pub fn select(payload: &Value, currency: &str) -> Result<Option<RateRow>, RateError> {
    let items = match payload.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => return Ok(None),
    };

    let wanted = currency.to_uppercase();
    items.iter().try_fold(None, |latest, item| -> Result<_, RateError> {
        let candidate = match item.as_object() {
            Some(record) => parse_record(record, &wanted)?,
            None => None,
        };
        Ok(pick_latest(latest, candidate))
    })
}

fn pick_latest(latest: Option<RateRow>, candidate: Option<RateRow>) -> Option<RateRow> {
    match (latest, candidate) {
        (Some(best), Some(row)) if row.rate_date > best.rate_date => Some(row),
        (Some(best), _) => Some(best),
        (None, row) => row,
    }
}

fn parse_record(record: &Map<String, Value>, wanted: &str) -> Result<Option<RateRow>, RateError> {
    let code = record
        .get("currency")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_uppercase();
    if code != wanted {
        return Ok(None);
    }

    let (Some(raw_date), Some(raw_value)) = (
        present(record.get("date")),
        present(record.get("value")),
    ) else {
        return Ok(None);
    };

    let rate_date = parse_date(raw_date).ok_or_else(|| RateError::InvalidDate {
        currency: code.clone(),
        raw: raw_text(raw_date),
    })?;
    let value = parse_value(raw_value).ok_or_else(|| RateError::InvalidValue {
        currency: code.clone(),
        raw: raw_text(raw_value),
    })?;

    let weight = parse_weight(record.get("weight"));
    if weight <= 0 {
        return Ok(None);
    }

    let display_name = record
        .get("nameEnglish")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(Some(RateRow {
        rate_date,
        currency_code: code,
        value,
        weight,
        display_name,
    }))
}

/// Treats `null` and empty strings the same as a missing field.
fn present(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_date(raw: &Value) -> Option<NaiveDate> {
    let s = raw.as_str()?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_value(raw: &Value) -> Option<Decimal> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Quotation unit. Numbers are truncated toward zero; anything that is not
/// an integer or a number falls back to 1.
fn parse_weight(raw: Option<&Value>) -> i64 {
    match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            })
            .unwrap_or(1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(1),
        _ => 1,
    }
}
