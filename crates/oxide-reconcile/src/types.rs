//! Portable column types.
//!
//! A [`ColumnDefinition`] describes a column in terms of one of five
//! [`LogicalType`]s. Each dialect maps the logical type to its own physical
//! type vocabulary (see [`Dialect::physical_type`]).
//!
//! [`Dialect::physical_type`]: crate::dialect::Dialect::physical_type

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::error::ReconcileError;

/// Length given to unbounded string primary-key columns.
pub const PRIMARY_KEY_DEFAULT_LENGTH: i32 = 300;

/// The five portable column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Character data, bounded or unbounded.
    #[serde(rename = "STR")]
    String,
    /// 64-bit signed integer.
    #[serde(rename = "INT")]
    Integer,
    /// Date and time of day.
    #[serde(rename = "DATE")]
    DateTime,
    /// Binary large object.
    #[serde(rename = "BYTEA")]
    Binary,
    /// Double-precision floating point.
    #[serde(rename = "FLOAT")]
    Float,
}

impl LogicalType {
    /// All logical types, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::String,
        Self::Integer,
        Self::DateTime,
        Self::Binary,
        Self::Float,
    ];

    /// Returns the tag used in definitions and catalogs.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::String => "STR",
            Self::Integer => "INT",
            Self::DateTime => "DATE",
            Self::Binary => "BYTEA",
            Self::Float => "FLOAT",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LogicalType {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STR" | "STRING" => Ok(Self::String),
            "INT" | "INTEGER" => Ok(Self::Integer),
            "DATE" | "DATETIME" => Ok(Self::DateTime),
            "BYTEA" | "BINARY" => Ok(Self::Binary),
            "FLOAT" => Ok(Self::Float),
            _ => Err(ReconcileError::UnsupportedType(s.to_string())),
        }
    }
}

/// A physical type read from a live catalog, remembered together with the
/// dialect that reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedType {
    /// Dialect the type string belongs to.
    pub dialect: DialectKind,
    /// The exact declared type, e.g. `character varying(20)`.
    pub raw: String,
}

/// Declared shape of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name, stored upper-case.
    pub name: String,
    /// Logical type.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Maximum length; zero or negative means unbounded. Only meaningful for
    /// [`LogicalType::String`].
    #[serde(default = "unbounded")]
    pub max_length: i32,
    /// Whether NULL is allowed.
    #[serde(default = "yes")]
    pub nullable: bool,
    /// Whether the column should carry its own single-column index.
    #[serde(default)]
    pub wants_index: bool,
    /// Names this column had before, most recent first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub former_names: Vec<String>,
    /// Physical type captured when the definition was derived from a live
    /// column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched: Option<FetchedType>,
}

const fn unbounded() -> i32 {
    -1
}

const fn yes() -> bool {
    true
}

impl ColumnDefinition {
    /// Creates a nullable, unindexed, unbounded column.
    #[must_use]
    pub fn new(name: impl AsRef<str>, logical_type: LogicalType) -> Self {
        Self {
            name: name.as_ref().trim().to_uppercase(),
            logical_type,
            max_length: -1,
            nullable: true,
            wants_index: false,
            former_names: Vec::new(),
            fetched: None,
        }
    }

    /// Shorthand for a string column of the given length.
    #[must_use]
    pub fn string(name: impl AsRef<str>, max_length: i32) -> Self {
        Self::new(name, LogicalType::String).max_length(max_length)
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, max_length: i32) -> Self {
        self.max_length = max_length;
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Requests a single-column index.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.wants_index = true;
        self
    }

    /// Appends a former name.
    #[must_use]
    pub fn former_name(mut self, name: impl AsRef<str>) -> Self {
        self.former_names.push(name.as_ref().trim().to_uppercase());
        self
    }

    /// Returns true when the length is unbounded.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max_length <= 0
    }
}

/// Structural equality used by the differ.
///
/// Name, logical type and nullability must match; lengths match when equal
/// or when both are unbounded, so `0` and `-1` compare equal.
#[must_use]
pub fn columns_equal(a: &ColumnDefinition, b: &ColumnDefinition) -> bool {
    a.name == b.name
        && a.logical_type == b.logical_type
        && a.nullable == b.nullable
        && (a.max_length == b.max_length || (a.is_unbounded() && b.is_unbounded()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_type_tags_round_trip() {
        for ty in LogicalType::ALL {
            assert_eq!(ty.tag().parse::<LogicalType>().unwrap(), ty);
        }
        assert_eq!("str".parse::<LogicalType>().unwrap(), LogicalType::String);
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = "money".parse::<LogicalType>().unwrap_err();
        assert!(matches!(err, ReconcileError::UnsupportedType(ref t) if t == "money"));
    }

    #[test]
    fn test_column_builder() {
        let col = ColumnDefinition::string("note", 20)
            .not_null()
            .indexed()
            .former_name("remark");

        assert_eq!(col.name, "NOTE");
        assert_eq!(col.max_length, 20);
        assert!(!col.nullable);
        assert!(col.wants_index);
        assert_eq!(col.former_names, vec!["REMARK"]);
    }

    #[test]
    fn test_unbounded_lengths_compare_equal() {
        let a = ColumnDefinition::string("A", 0).not_null();
        let b = ColumnDefinition::string("A", -1).not_null();
        assert!(columns_equal(&a, &b));
    }

    #[test]
    fn test_columns_equal_detects_differences() {
        let base = ColumnDefinition::string("A", 10);
        assert!(columns_equal(&base, &base.clone()));
        assert!(!columns_equal(&base, &base.clone().max_length(11)));
        assert!(!columns_equal(&base, &base.clone().not_null()));
        assert!(!columns_equal(
            &base,
            &ColumnDefinition::new("A", LogicalType::Integer)
        ));
        assert!(!columns_equal(&base, &ColumnDefinition::string("B", 10)));
    }

    #[test]
    fn test_index_flag_is_not_part_of_equality() {
        let a = ColumnDefinition::new("A", LogicalType::Float);
        assert!(columns_equal(&a, &a.clone().indexed()));
    }

    #[test]
    fn test_deserialize_defaults() {
        let col: ColumnDefinition =
            serde_json::from_str(r#"{"name":"AMT","type":"FLOAT"}"#).unwrap();
        assert_eq!(col.logical_type, LogicalType::Float);
        assert_eq!(col.max_length, -1);
        assert!(col.nullable);
        assert!(!col.wants_index);
    }
}
