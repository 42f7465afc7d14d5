//! Row serialization.
//!
//! Converts decoded rows into JSON objects keyed by column name. Temporal
//! values become ISO-8601 strings, exact decimals become floats and anything
//! else JSON has no native form for becomes its text representation.

use crate::models::{ColumnMetadata, NativeValue};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as JsonValue};

/// Convert one native value to JSON.
pub fn serialize_value(value: &NativeValue) -> JsonValue {
    match value {
        NativeValue::Null => JsonValue::Null,
        NativeValue::Bool(b) => JsonValue::Bool(*b),
        NativeValue::Int(i) => JsonValue::from(*i),
        NativeValue::UInt(u) => JsonValue::from(*u),
        NativeValue::Float(f) => float_or_text(*f),
        NativeValue::Text(s) | NativeValue::Other(s) => JsonValue::String(s.clone()),
        NativeValue::Decimal(text) => decimal_to_json(text),
        NativeValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
        NativeValue::Time(t) => JsonValue::String(t.format("%H:%M:%S%.f").to_string()),
        NativeValue::Timestamp(ts) => {
            JsonValue::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        NativeValue::TimestampTz(ts) => {
            JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false))
        }
        NativeValue::Bytes(bytes) => JsonValue::String(bytes_to_text(bytes)),
        // Structured documents are passed along as their JSON text
        NativeValue::Json(json) => JsonValue::String(json.to_string()),
    }
}

/// Convert rows to JSON objects keyed by column name.
///
/// Column order is preserved. When a result has duplicate column names the
/// last value wins, so such an object has fewer keys than columns.
pub fn rows_to_json(columns: &[ColumnMetadata], rows: &[Vec<NativeValue>]) -> Vec<Map<String, JsonValue>> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .map(|(col, value)| (col.name.clone(), serialize_value(value)))
                .collect()
        })
        .collect()
}

fn float_or_text(f: f64) -> JsonValue {
    // NaN and infinities have no JSON number form
    Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(f.to_string()))
}

fn decimal_to_json(text: &str) -> JsonValue {
    match text.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => float_or_text(f),
        _ => JsonValue::String(text.to_string()),
    }
}

/// UTF-8 payloads are returned as text, anything else base64 encoded.
fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => BASE64.encode(bytes),
    }
}
