//! MySQL column decoding.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's reported type name
//! 2. a per-category decoder extracts the value as a [`CellValue`]
//!
//! Rows arrive in the binary format for prepared statements and in the text
//! format for the fallback path; every decoder accepts both. Temporal values are
//! rendered the way MySQL prints them, so both paths yield the same strings.

use crate::models::{CellValue, Row};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo, ValueRef};

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Bit,
    Json,
    Date,
    Time,
    DateTime,
    Text,
}

/// Classify a MySQL type name, as reported by the driver, into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();
    let base = upper.strip_suffix(" UNSIGNED").unwrap_or(&upper);

    match base {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            TypeCategory::Integer
        }
        "FLOAT" | "DOUBLE" | "REAL" => TypeCategory::Float,
        "DECIMAL" | "NUMERIC" => TypeCategory::Decimal,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            TypeCategory::Binary
        }
        "BIT" => TypeCategory::Bit,
        "JSON" => TypeCategory::Json,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "DATETIME" | "TIMESTAMP" => TypeCategory::DateTime,
        // VARCHAR, TEXT, ENUM, SET, ...
        _ => TypeCategory::Text,
    }
}

/// Wrapper type for raw DECIMAL values as strings.
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

/// Decode every column of a row, keeping the server's column order.
pub fn decode_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let idx = column.ordinal();
            let category = categorize_type(column.type_info().name());
            (column.name().to_string(), decode_column(row, idx, category))
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> CellValue {
    let is_null = row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true);
    if is_null {
        return CellValue::Null;
    }

    match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Binary | TypeCategory::Bit => decode_binary(row, idx),
        TypeCategory::Date | TypeCategory::Time | TypeCategory::DateTime => {
            decode_temporal(row, idx, category)
        }
        TypeCategory::Json | TypeCategory::Text => decode_text(row, idx),
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> CellValue {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return CellValue::from(v);
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return CellValue::from(v);
    }
    // YEAR has no checked integer mapping.
    if let Ok(v) = row.try_get_unchecked::<i64, _>(idx) {
        return CellValue::from(v);
    }
    decode_text(row, idx)
}

fn decode_float(row: &MySqlRow, idx: usize) -> CellValue {
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return CellValue::from_f64(v);
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return CellValue::from_f64(f64::from(v));
    }
    decode_text(row, idx)
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> CellValue {
    match row.try_get::<RawDecimal, _>(idx) {
        Ok(v) => CellValue::String(v.0),
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            decode_text(row, idx)
        }
    }
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> CellValue {
    match row.try_get::<bool, _>(idx) {
        Ok(v) => CellValue::Bool(v),
        Err(_) => decode_integer(row, idx),
    }
}

fn decode_binary(row: &MySqlRow, idx: usize) -> CellValue {
    row.try_get_unchecked::<Vec<u8>, _>(idx)
        .map(CellValue::Binary)
        .unwrap_or(CellValue::Null)
}

fn decode_temporal(row: &MySqlRow, idx: usize, category: TypeCategory) -> CellValue {
    let rendered = match category {
        TypeCategory::Date => row
            .try_get::<NaiveDate, _>(idx)
            .map(|d| d.format("%Y-%m-%d").to_string()),
        TypeCategory::Time => row
            .try_get_unchecked::<MySqlTime, _>(idx)
            .map(|t| format_time(&t)),
        _ => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|dt| format_datetime(&dt)),
    };

    match rendered {
        Ok(s) => CellValue::String(s),
        Err(_) => decode_zero_temporal(row, idx, category),
    }
}

/// Zero dates such as `0000-00-00` have no chrono value.
fn decode_zero_temporal(row: &MySqlRow, idx: usize, category: TypeCategory) -> CellValue {
    match row.try_get_unchecked::<Vec<u8>, _>(idx) {
        // Binary format: a zero length prefix means every field is zero.
        Ok(bytes) if bytes.first().is_none_or(|len| *len == 0) => {
            CellValue::String(zero_temporal(category).to_string())
        }
        _ => decode_text(row, idx),
    }
}

fn zero_temporal(category: TypeCategory) -> &'static str {
    match category {
        TypeCategory::Date => "0000-00-00",
        TypeCategory::Time => "00:00:00",
        _ => "0000-00-00 00:00:00",
    }
}

/// `YYYY-MM-DD HH:MM:SS`, with microseconds when present.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// `[-]HH:MM:SS`, with microseconds when present. Hours may exceed 24.
pub fn format_time(t: &MySqlTime) -> String {
    let sign = if t.is_negative() { "-" } else { "" };
    let mut out = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        t.hours(),
        t.minutes(),
        t.seconds()
    );
    if t.microseconds() != 0 {
        out.push_str(&format!(".{:06}", t.microseconds()));
    }
    out
}

fn decode_text(row: &MySqlRow, idx: usize) -> CellValue {
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return CellValue::String(v);
    }
    match row.try_get_unchecked::<Vec<u8>, _>(idx) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(s) => CellValue::String(s),
            Err(e) => CellValue::Binary(e.into_bytes()),
        },
        Err(e) => {
            tracing::warn!(column = idx, error = %e, "Failed to decode column as text");
            CellValue::Null
        }
    }
}
