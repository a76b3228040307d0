//! SQLite dialect.
//!
//! SQLite stores the declared type verbatim and derives a type affinity
//! from it, so classification works on substrings of the declared type
//! (`VARCHAR(20)` has text affinity, `BIGINT` integer affinity).
//!
//! `ALTER TABLE` in SQLite can rename tables and columns and add or drop
//! columns, but cannot change a column's type or the primary key. Those
//! steps are reported as unsupported instead of rebuilding the table.

use crate::error::Result;
use crate::schema::{LiveColumnInfo, ObservedType, QualifiedName};
use crate::types::{ColumnDefinition, LogicalType};

use super::{CatalogColumn, Dialect, DialectKind, sql_literal};

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Table-valued pragma call for `table`, scoped to `schema` unless it is
    /// the main database.
    fn pragma(&self, function: &str, schema: &str, table: &str) -> String {
        if schema.eq_ignore_ascii_case(self.fixed_schema()) {
            format!("{function}({})", sql_literal(table))
        } else {
            format!("{function}({}, {})", sql_literal(table), sql_literal(schema))
        }
    }

    /// Length in parentheses, e.g. 20 for `TEXT(20)`.
    fn declared_length(declared: &str) -> Option<i32> {
        let (_, rest) = declared.split_once('(')?;
        let (length, _) = rest.split_once(')')?;
        length.trim().parse().ok()
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn physical_type(&self, logical_type: LogicalType, max_length: i32) -> String {
        match logical_type {
            LogicalType::String if max_length > 0 => format!("TEXT({max_length})"),
            LogicalType::String => "TEXT".to_string(),
            LogicalType::Integer => "INTEGER".to_string(),
            LogicalType::Float => "REAL".to_string(),
            LogicalType::DateTime => "DATE".to_string(),
            LogicalType::Binary => "BLOB".to_string(),
        }
    }

    fn classify(&self, column: &CatalogColumn) -> ObservedType {
        let declared = column.data_type.to_uppercase();
        let has = |needle: &str| declared.contains(needle);
        let logical_type = if has("INT") {
            LogicalType::Integer
        } else if has("CHAR") || has("CLOB") || has("TEXT") {
            LogicalType::String
        } else if has("BLOB") || has("BYTEA") || declared.is_empty() {
            LogicalType::Binary
        } else if has("DATE") || has("TIME") {
            LogicalType::DateTime
        } else {
            LogicalType::Float
        };
        ObservedType::Known(logical_type)
    }

    fn observed_length(&self, column: &CatalogColumn) -> i32 {
        match self.classify(column) {
            ObservedType::Known(LogicalType::String) => {
                Self::declared_length(&column.data_type).unwrap_or(-1)
            }
            _ => 0,
        }
    }

    fn current_schema_sql(&self) -> Option<&'static str> {
        None
    }

    fn table_exists_sql(&self, schema: &str, table: &str) -> String {
        let master = if schema.eq_ignore_ascii_case(self.fixed_schema()) {
            "sqlite_master".to_string()
        } else {
            format!("{}.sqlite_master", self.quote_identifier(schema))
        };
        format!(
            "SELECT count(*) AS CNT FROM {master} WHERE type = 'table' AND upper(name) = {}",
            sql_literal(table)
        )
    }

    fn columns_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(name) AS NAME, type AS DATA_TYPE, \
             CASE WHEN \"notnull\" = 0 THEN 1 ELSE 0 END AS NULLABLE, \
             NULL AS MAX_LENGTH, type AS RAW_TYPE, \
             NULL AS DATA_PRECISION, NULL AS DATA_SCALE \
             FROM {} ORDER BY cid",
            self.pragma("pragma_table_info", schema, table)
        )
    }

    fn primary_key_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(name) AS NAME, NULL AS CONSTRAINT_NAME \
             FROM {} WHERE pk > 0 ORDER BY pk",
            self.pragma("pragma_table_info", schema, table)
        )
    }

    fn indexes_sql(&self, schema: &str, table: &str) -> String {
        let info = if schema.eq_ignore_ascii_case(self.fixed_schema()) {
            "pragma_index_info(il.name)".to_string()
        } else {
            format!("pragma_index_info(il.name, {})", sql_literal(schema))
        };
        format!(
            "SELECT NULL AS INDEX_OWNER, upper(il.name) AS INDEX_NAME, \
             upper(min(ii.name)) AS COLUMN_NAME \
             FROM {} AS il, {info} AS ii \
             WHERE il.origin = 'c' AND il.\"unique\" = 0 \
             GROUP BY il.name HAVING count(*) = 1 \
             ORDER BY il.name",
            self.pragma("pragma_index_list", schema, table)
        )
    }

    fn alter_column_sql(
        &self,
        table: &QualifiedName,
        column: &ColumnDefinition,
        _current: &LiveColumnInfo,
    ) -> Result<Vec<String>> {
        Err(self.unsupported(&format!("alter column {}", column.name), table))
    }

    fn create_index_sql(&self, table: &QualifiedName, column: &str) -> String {
        // The schema qualifies the index name, never the table.
        let index = QualifiedName {
            schema: table.schema.clone(),
            table: self.index_name(table, column),
        };
        format!(
            "CREATE INDEX {} ON {} ({})",
            self.quote_table(&index),
            self.quote_identifier(&table.table),
            self.quote_identifier(column)
        )
    }

    fn add_primary_key_sql(&self, table: &QualifiedName, _columns: &[String]) -> Result<String> {
        Err(self.unsupported("add a primary key", table))
    }

    fn drop_primary_key_sql(
        &self,
        table: &QualifiedName,
        _constraint: Option<&str>,
    ) -> Result<String> {
        Err(self.unsupported("drop the primary key", table))
    }
}
