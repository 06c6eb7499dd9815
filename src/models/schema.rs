//! Schema-related data models.
//!
//! Column descriptors mirror the output of MySQL's `DESCRIBE` statement, so the
//! serialized keys are `Field`, `Type`, `Null`, `Key`, `Default` and `Extra`.

use crate::error::{GatewayError, GatewayResult};
use crate::models::value::Row;
use serde::Serialize;

/// One column of a table as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDescriptor {
    pub field: String,
    #[serde(rename = "Type")]
    pub column_type: String,
    /// "YES" or "NO"
    pub null: String,
    /// "PRI", "UNI", "MUL" or empty
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

/// Ordered column descriptors of one table.
pub type TableSchema = Vec<ColumnDescriptor>;

impl ColumnDescriptor {
    pub fn name(&self) -> &str {
        &self.field
    }

    pub fn is_nullable(&self) -> bool {
        self.null.eq_ignore_ascii_case("YES")
    }

    pub fn is_primary_key(&self) -> bool {
        self.key.eq_ignore_ascii_case("PRI")
    }

    /// Build a descriptor from one `DESCRIBE` row.
    ///
    /// MySQL may report these columns as VARBINARY depending on the connection
    /// charset, so every value is read through its text form.
    pub fn from_describe_row(row: &Row) -> GatewayResult<Self> {
        let text = |column: &str| row.get_ignore_case(column).and_then(|v| v.as_text());

        let field = text("Field").ok_or_else(|| {
            GatewayError::execution("DESCRIBE result is missing the Field column", None)
        })?;

        Ok(Self {
            field,
            column_type: text("Type").unwrap_or_default(),
            null: text("Null").unwrap_or_default(),
            key: text("Key").unwrap_or_default(),
            default: text("Default"),
            extra: text("Extra").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value::CellValue;

    fn describe_row() -> Row {
        Row::new()
            .with("Field", "id")
            .with("Type", CellValue::Binary(b"int unsigned".to_vec()))
            .with("Null", "NO")
            .with("Key", "PRI")
            .with("Default", CellValue::Null)
            .with("Extra", "auto_increment")
    }

    #[test]
    fn test_from_describe_row() {
        let column = ColumnDescriptor::from_describe_row(&describe_row()).unwrap();
        assert_eq!(column.name(), "id");
        assert_eq!(column.column_type, "int unsigned");
        assert!(!column.is_nullable());
        assert!(column.is_primary_key());
        assert_eq!(column.default, None);
        assert_eq!(column.extra, "auto_increment");
    }

    #[test]
    fn test_missing_field_column_is_an_error() {
        let row = Row::new().with("Type", "int");
        assert!(ColumnDescriptor::from_describe_row(&row).is_err());
    }

    #[test]
    fn test_serializes_with_describe_keys() {
        let column = ColumnDescriptor::from_describe_row(&describe_row()).unwrap();
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["Field"], "id");
        assert_eq!(json["Type"], "int unsigned");
        assert_eq!(json["Null"], "NO");
        assert_eq!(json["Key"], "PRI");
        assert!(json["Default"].is_null());
        assert_eq!(json["Extra"], "auto_increment");
    }
}
