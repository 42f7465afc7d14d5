//! Driver type mappings.
//!
//! This module maps driver-specific column types onto [`NativeType`] and
//! decodes row values into [`NativeValue`].
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `categorize_type` classifies a driver type name into a `NativeType`
//! 2. Database-specific decoders extract the value for that type
//!
//! Values a decoder cannot extract with a typed decode fall back to their
//! text form, so a row never fails to decode because of an exotic type.

use crate::models::{ColumnMetadata, DatabaseType, NativeType, NativeValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Classify a driver type name into a native type.
///
/// Length/precision suffixes (`NUMERIC(10,2)`) and the MySQL `UNSIGNED`
/// qualifier are ignored.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> NativeType {
    let lower = type_name.to_lowercase();
    let base = lower
        .split('(')
        .next()
        .unwrap_or_default()
        .trim_end_matches(" unsigned")
        .trim();

    match base {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "int" | "bigint" | "tinyint"
        | "mediumint" | "serial" | "bigserial" | "smallserial" | "year" | "oid" => {
            NativeType::Integer
        }
        // SQLite's NUMERIC is an affinity, values come back as REAL or INTEGER
        "numeric" if db == DatabaseType::SQLite => NativeType::Float,
        "numeric" | "decimal" | "money" => NativeType::Decimal,
        "float4" | "float8" | "real" | "float" | "double" | "double precision" => {
            NativeType::Float
        }
        "bool" | "boolean" => NativeType::Boolean,
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "name"
        | "citext" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set" => NativeType::Text,
        "date" => NativeType::Date,
        "time" | "timetz" => NativeType::Time,
        "timestamp" | "datetime" => NativeType::Timestamp,
        "timestamptz" => NativeType::TimestampTz,
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            NativeType::Binary
        }
        "json" | "jsonb" => NativeType::Json,
        "uuid" => NativeType::Uuid,
        "null" | "" => NativeType::Null,
        _ => NativeType::Unknown(type_name.to_string()),
    }
}

/// Native type describing a decoded value, used when the driver could not
/// report a column type up front.
pub fn type_of_value(value: &NativeValue) -> NativeType {
    match value {
        NativeValue::Null => NativeType::Null,
        NativeValue::Bool(_) => NativeType::Boolean,
        NativeValue::Int(_) | NativeValue::UInt(_) => NativeType::Integer,
        NativeValue::Float(_) => NativeType::Float,
        NativeValue::Text(_) => NativeType::Text,
        NativeValue::Decimal(_) => NativeType::Decimal,
        NativeValue::Date(_) => NativeType::Date,
        NativeValue::Time(_) => NativeType::Time,
        NativeValue::Timestamp(_) => NativeType::Timestamp,
        NativeValue::TimestampTz(_) => NativeType::TimestampTz,
        NativeValue::Bytes(_) => NativeType::Binary,
        NativeValue::Json(_) => NativeType::Json,
        NativeValue::Other(_) => NativeType::Unknown("object".to_string()),
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal") || name == "money"
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Text Parsing
// =============================================================================

/// Parse JSON document text, keeping the raw text when it is not valid JSON.
fn json_or_text(text: String) -> NativeValue {
    match serde_json::from_str(&text) {
        Ok(json) => NativeValue::Json(json),
        Err(_) => NativeValue::Other(text),
    }
}

/// Parse temporal text (SQLite stores dates as TEXT).
pub fn parse_temporal(text: &str, native: &NativeType) -> Option<NativeValue> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let text = text.trim();

    if matches!(native, NativeType::Time) {
        return NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
            .ok()
            .map(NativeValue::Time);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(NativeValue::Date(date));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(NativeValue::TimestampTz(ts.with_timezone(&Utc)));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(NativeValue::Timestamp)
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Trait for converting database rows to native values.
pub trait RowDecode {
    /// Column metadata as reported by the row itself.
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
    /// Decode every column of the row, in column order.
    fn decode_values(&self) -> Vec<NativeValue>;
}

impl RowDecode for MySqlRow {
    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| {
                ColumnMetadata::new(
                    col.name(),
                    NativeType::from_type_name(col.type_info().name(), DatabaseType::MySQL),
                )
            })
            .collect()
    }

    fn decode_values(&self) -> Vec<NativeValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let native =
                    NativeType::from_type_name(col.type_info().name(), DatabaseType::MySQL);
                mysql::decode_column(self, idx, &native)
            })
            .collect()
    }
}

impl RowDecode for PgRow {
    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| {
                ColumnMetadata::new(
                    col.name(),
                    NativeType::from_type_name(
                        col.type_info().name(),
                        DatabaseType::PostgreSQL,
                    ),
                )
            })
            .collect()
    }

    fn decode_values(&self) -> Vec<NativeValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let native =
                    NativeType::from_type_name(col.type_info().name(), DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, &native)
            })
            .collect()
    }
}

impl RowDecode for SqliteRow {
    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| {
                ColumnMetadata::new(
                    col.name(),
                    NativeType::from_type_name(col.type_info().name(), DatabaseType::SQLite),
                )
            })
            .collect()
    }

    fn decode_values(&self) -> Vec<NativeValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let declared =
                    NativeType::from_type_name(col.type_info().name(), DatabaseType::SQLite);
                sqlite::decode_column(self, idx, &declared)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, native: &NativeType) -> NativeValue {
        match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return NativeValue::Null,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(column = idx, error = %e, "Failed to read MySQL column");
                return NativeValue::Null;
            }
        }

        let decoded = match native {
            NativeType::Integer => row
                .try_get::<i64, _>(idx)
                .map(NativeValue::Int)
                .or_else(|_| row.try_get::<u64, _>(idx).map(NativeValue::UInt))
                .ok(),
            NativeType::Float => row
                .try_get::<f64, _>(idx)
                .or_else(|_| row.try_get::<f32, _>(idx).map(f64::from))
                .map(NativeValue::Float)
                .ok(),
            NativeType::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .map(|v| NativeValue::Decimal(v.0))
                .ok(),
            NativeType::Boolean => row.try_get::<bool, _>(idx).map(NativeValue::Bool).ok(),
            NativeType::Text => row.try_get::<String, _>(idx).map(NativeValue::Text).ok(),
            NativeType::Date => row.try_get::<NaiveDate, _>(idx).map(NativeValue::Date).ok(),
            NativeType::Time => row.try_get::<NaiveTime, _>(idx).map(NativeValue::Time).ok(),
            NativeType::Timestamp | NativeType::TimestampTz => row
                .try_get::<NaiveDateTime, _>(idx)
                .map(NativeValue::Timestamp)
                .ok(),
            NativeType::Binary => row.try_get::<Vec<u8>, _>(idx).map(NativeValue::Bytes).ok(),
            NativeType::Json => row
                .try_get_unchecked::<String, _>(idx)
                .map(json_or_text)
                .ok(),
            NativeType::Uuid | NativeType::Null | NativeType::Unknown(_) => None,
        };

        decoded.unwrap_or_else(|| fallback(row, idx))
    }

    /// Text protocol values can always be read as text or bytes.
    fn fallback(row: &MySqlRow, idx: usize) -> NativeValue {
        if let Ok(text) = row.try_get_unchecked::<String, _>(idx) {
            return NativeValue::Other(text);
        }
        match row.try_get_unchecked::<Vec<u8>, _>(idx) {
            Ok(bytes) => NativeValue::Bytes(bytes),
            Err(e) => {
                tracing::error!(column = idx, error = %e, "Failed to decode MySQL value");
                NativeValue::Null
            }
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::types::Oid;

    pub fn decode_column(row: &PgRow, idx: usize, native: &NativeType) -> NativeValue {
        match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return NativeValue::Null,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(column = idx, error = %e, "Failed to read PostgreSQL column");
                return NativeValue::Null;
            }
        }

        let decoded = match native {
            NativeType::Integer => row
                .try_get::<i16, _>(idx)
                .map(i64::from)
                .or_else(|_| row.try_get::<i32, _>(idx).map(i64::from))
                .or_else(|_| row.try_get::<i64, _>(idx))
                .or_else(|_| row.try_get::<Oid, _>(idx).map(|oid| i64::from(oid.0)))
                .map(NativeValue::Int)
                .ok(),
            NativeType::Float => row
                .try_get::<f64, _>(idx)
                .or_else(|_| row.try_get::<f32, _>(idx).map(f64::from))
                .map(NativeValue::Float)
                .ok(),
            NativeType::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .map(|v| NativeValue::Decimal(v.0))
                .ok(),
            NativeType::Boolean => row.try_get::<bool, _>(idx).map(NativeValue::Bool).ok(),
            NativeType::Text => row.try_get::<String, _>(idx).map(NativeValue::Text).ok(),
            NativeType::Date => row.try_get::<NaiveDate, _>(idx).map(NativeValue::Date).ok(),
            NativeType::Time => row.try_get::<NaiveTime, _>(idx).map(NativeValue::Time).ok(),
            NativeType::Timestamp => row
                .try_get::<NaiveDateTime, _>(idx)
                .map(NativeValue::Timestamp)
                .ok(),
            NativeType::TimestampTz => row
                .try_get::<DateTime<Utc>, _>(idx)
                .map(NativeValue::TimestampTz)
                .ok(),
            NativeType::Binary => row.try_get::<Vec<u8>, _>(idx).map(NativeValue::Bytes).ok(),
            NativeType::Json => row
                .try_get_unchecked::<String, _>(idx)
                .map(json_or_text)
                .ok(),
            NativeType::Uuid | NativeType::Null | NativeType::Unknown(_) => None,
        };

        decoded.unwrap_or_else(|| fallback(row, idx))
    }

    /// Simple-protocol results are text encoded, so any type reads as text.
    fn fallback(row: &PgRow, idx: usize) -> NativeValue {
        match row.try_get_unchecked::<String, _>(idx) {
            Ok(text) => NativeValue::Other(text),
            Err(e) => {
                tracing::error!(column = idx, error = %e, "Failed to decode PostgreSQL value");
                NativeValue::Null
            }
        }
    }
}

mod sqlite {
    use super::*;

    /// SQLite values are dynamically typed: the storage class of the value
    /// decides the decode, the declared column type only refines it.
    pub fn decode_column(row: &SqliteRow, idx: usize, declared: &NativeType) -> NativeValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return NativeValue::Null,
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(e) => {
                tracing::error!(column = idx, error = %e, "Failed to read SQLite column");
                return NativeValue::Null;
            }
        };

        match storage.as_str() {
            "INTEGER" => match row.try_get::<i64, _>(idx) {
                Ok(v) if matches!(declared, NativeType::Boolean) => NativeValue::Bool(v != 0),
                Ok(v) => NativeValue::Int(v),
                Err(_) => decode_text(row, idx, declared),
            },
            "REAL" => row
                .try_get::<f64, _>(idx)
                .map(NativeValue::Float)
                .unwrap_or_else(|_| decode_text(row, idx, declared)),
            "BLOB" => row
                .try_get::<Vec<u8>, _>(idx)
                .map(NativeValue::Bytes)
                .unwrap_or(NativeValue::Null),
            _ => decode_text(row, idx, declared),
        }
    }

    fn decode_text(row: &SqliteRow, idx: usize, declared: &NativeType) -> NativeValue {
        let text = match row.try_get_unchecked::<String, _>(idx) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(column = idx, error = %e, "Failed to decode SQLite value");
                return NativeValue::Null;
            }
        };

        match declared {
            NativeType::Date
            | NativeType::Time
            | NativeType::Timestamp
            | NativeType::TimestampTz => {
                parse_temporal(&text, declared).unwrap_or(NativeValue::Text(text))
            }
            NativeType::Json => json_or_text(text),
            _ => NativeValue::Text(text),
        }
    }
}
