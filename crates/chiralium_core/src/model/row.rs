//! Fetched row representation and typed accessors.
//!
//! # Responsibility
//! - Hold one row as returned by a row store, keyed by column name.
//! - Give parse functions typed, error-reporting access to its values.
//!
//! # Invariants
//! - Accessors never coerce text to numbers or vice versa.
//! - SQLite integer booleans (`0`/`1`) are accepted where a boolean is asked for.

use crate::model::column::ColumnValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ParseResult<T> = Result<T, ParseError>;

/// Failure to turn a fetched row back into a typed entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The entity type never supplied a parse function.
    NotImplemented,
    MissingColumn(String),
    InvalidValue {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    Invalid(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotImplemented => write!(f, "parse is not implemented for this entity"),
            Self::MissingColumn(column) => write!(f, "column `{column}` is missing"),
            Self::InvalidValue {
                column,
                expected,
                found,
            } => write!(f, "column `{column}` expected {expected}, found {found}"),
            Self::Invalid(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ParseError {}

/// One row fetched from a row store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: BTreeMap<String, ColumnValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for test doubles.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn text(&self, column: &str) -> ParseResult<String> {
        match self.require(column)? {
            ColumnValue::Text(value) => Ok(value.clone()),
            other => Err(invalid(column, "text", other)),
        }
    }

    pub fn optional_text(&self, column: &str) -> ParseResult<Option<String>> {
        match self.require(column)? {
            ColumnValue::Null => Ok(None),
            ColumnValue::Text(value) => Ok(Some(value.clone())),
            other => Err(invalid(column, "text or null", other)),
        }
    }

    pub fn integer(&self, column: &str) -> ParseResult<i64> {
        match self.require(column)? {
            ColumnValue::Integer(value) => Ok(*value),
            other => Err(invalid(column, "integer", other)),
        }
    }

    pub fn optional_integer(&self, column: &str) -> ParseResult<Option<i64>> {
        match self.require(column)? {
            ColumnValue::Null => Ok(None),
            ColumnValue::Integer(value) => Ok(Some(*value)),
            other => Err(invalid(column, "integer or null", other)),
        }
    }

    /// Reads a floating point column; integer storage is widened.
    pub fn real(&self, column: &str) -> ParseResult<f64> {
        match self.require(column)? {
            ColumnValue::Real(value) => Ok(*value),
            ColumnValue::Integer(value) => Ok(*value as f64),
            other => Err(invalid(column, "real", other)),
        }
    }

    pub fn boolean(&self, column: &str) -> ParseResult<bool> {
        match self.require(column)? {
            ColumnValue::Boolean(value) => Ok(*value),
            ColumnValue::Integer(0) => Ok(false),
            ColumnValue::Integer(1) => Ok(true),
            other => Err(invalid(column, "boolean", other)),
        }
    }

    pub fn bytes(&self, column: &str) -> ParseResult<Vec<u8>> {
        match self.require(column)? {
            ColumnValue::Blob(value) => Ok(value.clone()),
            other => Err(invalid(column, "blob", other)),
        }
    }

    fn require(&self, column: &str) -> ParseResult<&ColumnValue> {
        self.values
            .get(column)
            .ok_or_else(|| ParseError::MissingColumn(column.to_string()))
    }
}

impl FromIterator<(String, ColumnValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, ColumnValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn invalid(column: &str, expected: &'static str, found: &ColumnValue) -> ParseError {
    ParseError::InvalidValue {
        column: column.to_string(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseError, Row};
    use crate::model::column::ColumnValue;

    #[test]
    fn boolean_accepts_sqlite_integer_encoding() {
        let row = Row::new().with("a", 1_i64).with("b", 0_i64).with("c", true);
        assert!(row.boolean("a").unwrap());
        assert!(!row.boolean("b").unwrap());
        assert!(row.boolean("c").unwrap());

        let err = Row::new().with("a", 2_i64).boolean("a").unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn missing_and_mistyped_columns_are_reported() {
        let row = Row::new().with("count", "42");
        assert_eq!(
            row.integer("url").unwrap_err(),
            ParseError::MissingColumn("url".to_string())
        );
        assert_eq!(
            row.integer("count").unwrap_err(),
            ParseError::InvalidValue {
                column: "count".to_string(),
                expected: "integer",
                found: "text",
            }
        );
    }

    #[test]
    fn row_serializes_as_flat_column_map() {
        let row = Row::new()
            .with("id", "abc")
            .with("count", 42_i64)
            .with("note", ColumnValue::Null);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": "abc", "count": 42, "note": null })
        );

        let decoded: Row = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn optional_accessors_map_null_to_none() {
        let row = Row::new()
            .with("note", ColumnValue::Null)
            .with("ttl", ColumnValue::Null);
        assert_eq!(row.optional_text("note").unwrap(), None);
        assert_eq!(row.optional_integer("ttl").unwrap(), None);
        assert_eq!(row.real("missing").unwrap_err(), ParseError::MissingColumn("missing".into()));
    }
}
