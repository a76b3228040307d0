//! Table definitions and live catalog snapshots.
//!
//! A [`TableDefinition`] is what the caller wants; a [`LiveTableInfo`] is
//! what the database currently has. The differ compares the two.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::error::{ReconcileError, Result};
use crate::types::{ColumnDefinition, FetchedType, LogicalType, PRIMARY_KEY_DEFAULT_LENGTH};

/// Returns true if `name` may be used as a table, schema or column name.
///
/// Letters (any script), digits, `_`, `$` and `#` are accepted.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '#'))
}

/// A table name with an optional schema, both upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    /// Schema, or `None` for the connection's default schema.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
}

impl QualifiedName {
    /// Parses `table` or `schema.table`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Definition`] when either part is not a
    /// valid identifier.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim().to_uppercase();
        let (schema, table) = match name.split_once('.') {
            Some((schema, table)) => (Some(schema.to_string()), table.to_string()),
            None => (None, name.clone()),
        };
        if !is_valid_identifier(&table) || !schema.as_deref().map_or(true, is_valid_identifier) {
            return Err(ReconcileError::definition(name, "invalid table name"));
        }
        Ok(Self { schema, table })
    }

    /// Builds a name from already-validated parts.
    #[must_use]
    pub fn new(schema: Option<&str>, table: &str) -> Self {
        Self {
            schema: schema.map(str::to_uppercase),
            table: table.to_uppercase(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.table),
            None => f.write_str(&self.table),
        }
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = ReconcileError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<QualifiedName> for String {
    fn from(value: QualifiedName) -> Self {
        value.to_string()
    }
}

/// The desired shape of a table.
///
/// Construction validates and normalizes the definition:
///
/// - all names are upper-case and valid identifiers;
/// - column names are unique, and primary-key entries name existing columns;
/// - primary-key columns are NOT NULL, and unbounded string keys get
///   [`PRIMARY_KEY_DEFAULT_LENGTH`];
/// - lengths of non-string columns are cleared to `-1`;
/// - former names of the table and of each column are unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    name: QualifiedName,
    columns: Vec<ColumnDefinition>,
    #[serde(default)]
    primary_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    former_names: Vec<QualifiedName>,
}

impl TableDefinition {
    /// Creates and validates a definition.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Definition`] for malformed definitions and
    /// [`ReconcileError::AmbiguousFormerName`] for conflicting column former
    /// names.
    pub fn new(
        name: &str,
        columns: Vec<ColumnDefinition>,
        primary_key: Vec<String>,
    ) -> Result<Self> {
        Self {
            name: QualifiedName::parse(name)?,
            columns,
            primary_key,
            former_names: Vec::new(),
        }
        .validated()
    }

    /// Sets the names this table had before, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Definition`] for invalid names and
    /// [`ReconcileError::AmbiguousFormerName`] for duplicates.
    pub fn with_former_names<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.former_names = names
            .into_iter()
            .map(|n| QualifiedName::parse(n.as_ref()))
            .collect::<Result<_>>()?;
        self.check_former_names()?;
        Ok(self)
    }

    /// Validates and normalizes a definition, e.g. one read from JSON.
    ///
    /// # Errors
    ///
    /// See [`TableDefinition::new`].
    pub fn validated(mut self) -> Result<Self> {
        let table = self.name.to_string();
        if self.columns.is_empty() {
            return Err(ReconcileError::definition(table, "a table needs at least one column"));
        }

        let mut seen = HashSet::new();
        for col in &mut self.columns {
            col.name = col.name.trim().to_uppercase();
            if !is_valid_identifier(&col.name) {
                return Err(ReconcileError::definition(
                    &table,
                    format!("invalid column name '{}'", col.name),
                ));
            }
            if !seen.insert(col.name.clone()) {
                return Err(ReconcileError::definition(
                    &table,
                    format!("duplicate column '{}'", col.name),
                ));
            }
            if col.logical_type != LogicalType::String {
                col.max_length = -1;
            }
            for former in &mut col.former_names {
                *former = former.trim().to_uppercase();
                if !is_valid_identifier(former) {
                    return Err(ReconcileError::definition(
                        &table,
                        format!("invalid former column name '{former}'"),
                    ));
                }
            }
        }

        let mut pk_seen = HashSet::new();
        for key in &mut self.primary_key {
            *key = key.trim().to_uppercase();
            if !pk_seen.insert(key.clone()) {
                return Err(ReconcileError::definition(
                    &table,
                    format!("primary key lists '{key}' twice"),
                ));
            }
            let Some(col) = self.columns.iter_mut().find(|c| c.name == *key) else {
                return Err(ReconcileError::definition(
                    &table,
                    format!("primary key column '{key}' is not defined"),
                ));
            };
            col.nullable = false;
            if col.logical_type == LogicalType::String && col.is_unbounded() {
                col.max_length = PRIMARY_KEY_DEFAULT_LENGTH;
            }
        }

        self.check_column_former_names()?;
        self.check_former_names()?;
        Ok(self)
    }

    /// Rejects table former names that repeat each other or the current
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::AmbiguousFormerName`].
    pub fn check_former_names(&self) -> Result<()> {
        let mut seen = HashSet::from([&self.name]);
        for former in &self.former_names {
            if !seen.insert(former) {
                return Err(ReconcileError::AmbiguousFormerName {
                    target: self.name.to_string(),
                    name: former.to_string(),
                    reason: "listed more than once among the current and former names"
                        .to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_column_former_names(&self) -> Result<()> {
        let current: HashSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let mut claimed = HashSet::new();
        for col in &self.columns {
            for former in &col.former_names {
                let reason = if current.contains(former.as_str()) {
                    "is also the name of a defined column"
                } else if !claimed.insert(former.as_str()) {
                    "is claimed more than once"
                } else {
                    continue;
                };
                return Err(ReconcileError::AmbiguousFormerName {
                    target: format!("{}.{}", self.name, col.name),
                    name: former.clone(),
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The table name.
    #[must_use]
    pub const fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Primary-key columns in key order.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Former table names, most recent first.
    #[must_use]
    pub fn former_names(&self) -> &[QualifiedName] {
        &self.former_names
    }

    /// Finds a column by (case-insensitive) name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        let name = name.to_uppercase();
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Type of a live column as classified from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservedType {
    /// Maps onto a logical type.
    Known(LogicalType),
    /// A catalog type with no logical counterpart. Never equal to a
    /// declared column, so such columns are always altered.
    Opaque(String),
}

/// A column as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveColumnInfo {
    /// Column name, upper-case.
    pub name: String,
    /// Classified type.
    pub observed_type: ObservedType,
    /// Reported length; zero or negative when unbounded or not applicable.
    pub max_length: i32,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Declared physical type, verbatim from the catalog.
    pub raw_type: String,
    /// Name of the single-column index on this column, if any. Qualified as
    /// `OWNER.NAME` when the index lives outside the default schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

impl LiveColumnInfo {
    /// Logical view of this column, remembering the raw type for `dialect`.
    ///
    /// Returns `None` when the observed type is opaque.
    #[must_use]
    pub fn to_definition(&self, dialect: DialectKind) -> Option<ColumnDefinition> {
        let ObservedType::Known(logical_type) = self.observed_type else {
            return None;
        };
        Some(ColumnDefinition {
            name: self.name.clone(),
            logical_type,
            max_length: if logical_type == LogicalType::String {
                self.max_length
            } else {
                -1
            },
            nullable: self.nullable,
            wants_index: self.index_name.is_some(),
            former_names: Vec::new(),
            fetched: Some(FetchedType {
                dialect,
                raw: self.raw_type.clone(),
            }),
        })
    }
}

/// A table as it exists in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTableInfo {
    /// Table name as it was looked up.
    pub name: QualifiedName,
    /// Columns in catalog order.
    pub columns: Vec<LiveColumnInfo>,
    /// Primary-key columns in key order.
    pub primary_key: Vec<String>,
    /// Name of the primary-key constraint, where the catalog has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_name: Option<String>,
}

impl LiveTableInfo {
    /// Finds a column by upper-case name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&LiveColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if the table has a primary key.
    #[must_use]
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}
