//! Driver-native column types and values.
//!
//! Rows coming out of a driver are decoded into [`NativeValue`]s before any
//! JSON conversion happens, so the serializer can apply its rules by value
//! kind rather than by guessing from strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};

/// Logical type of a result column, mapped from the driver's type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Binary,
    Json,
    Uuid,
    /// SQLite expression columns with no declared type and no value to infer from
    Null,
    /// Driver type without a dedicated mapping; holds the driver's name
    Unknown(String),
}

impl NativeType {
    /// Map a driver type name for the given backend.
    pub fn from_type_name(name: &str, backend: super::DatabaseType) -> Self {
        crate::db::types::categorize_type(name, backend)
    }

    /// Readable type label reported in query metadata.
    pub fn display_name(&self) -> String {
        match self {
            Self::Integer => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Decimal => "Decimal".to_string(),
            Self::Boolean => "bool".to_string(),
            Self::Text => "str".to_string(),
            Self::Date => "date".to_string(),
            Self::Time => "time".to_string(),
            Self::Timestamp | Self::TimestampTz => "datetime".to_string(),
            Self::Binary => "bytes".to_string(),
            Self::Json => "json".to_string(),
            Self::Uuid => "uuid".to_string(),
            Self::Null => "NoneType".to_string(),
            Self::Unknown(name) => name.to_lowercase(),
        }
    }
}

impl std::fmt::Display for NativeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// A single decoded value as produced by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// Exact decimal text as returned by the database
    Decimal(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    /// Any other driver value, already rendered as text
    Other(String),
}

impl NativeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Native values serialize through the row serializer rules, so anything
/// that embeds them (the response envelope included) stays JSON-safe.
impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::tools::serializer::serialize_value(self).serialize(serializer)
    }
}

/// Column name and type of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub native_type: NativeType,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, native_type: NativeType) -> Self {
        Self {
            name: name.into(),
            native_type,
        }
    }
}

/// Rows returned by a statement that produced a result set.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<ColumnMetadata>,
    /// Each row is aligned with `columns`
    pub rows: Vec<Vec<NativeValue>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(NativeType::Integer.display_name(), "int");
        assert_eq!(NativeType::Decimal.display_name(), "Decimal");
        assert_eq!(NativeType::Text.display_name(), "str");
        assert_eq!(NativeType::Timestamp.display_name(), "datetime");
        assert_eq!(NativeType::TimestampTz.display_name(), "datetime");
        assert_eq!(NativeType::Binary.display_name(), "bytes");
    }

    #[test]
    fn test_unknown_type_falls_back_to_driver_name() {
        assert_eq!(
            NativeType::Unknown("INTERVAL".to_string()).display_name(),
            "interval"
        );
    }

    #[test]
    fn test_native_value_serializes_json_safe() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let values = vec![
            NativeValue::Int(7),
            NativeValue::Decimal("12.50".to_string()),
            NativeValue::Date(date),
            NativeValue::Null,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[7,12.5,"2024-03-05",null]"#);
    }
}
