//! Database dialect implementations.
//!
//! Each dialect knows three things about its database:
//!
//! - how logical types map to physical column types;
//! - how to read table structure back out of the catalog;
//! - how to render each [`MigrationStep`] as DDL.
//!
//! Dialects are stateless and shared freely between reconcilers.

mod mysql;
mod oracle;
mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::connection::Row;
use crate::error::{DbError, ReconcileError, Result};
use crate::plan::MigrationStep;
use crate::schema::{LiveColumnInfo, ObservedType, QualifiedName, TableDefinition};
use crate::types::{ColumnDefinition, LogicalType};
use crate::value::{Value, values_equal};

/// The supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// PostgreSQL.
    Postgres,
    /// Oracle.
    Oracle,
    /// MySQL and MariaDB.
    MySql,
    /// SQLite 3.
    Sqlite,
}

impl DialectKind {
    /// Canonical identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Oracle => "oracle",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite3",
        }
    }

    /// The dialect implementation for this backend.
    #[must_use]
    pub fn dialect(self) -> Arc<dyn Dialect> {
        match self {
            Self::Postgres => Arc::new(PostgresDialect::new()),
            Self::Oracle => Arc::new(OracleDialect::new()),
            Self::MySql => Arc::new(MySqlDialect::new()),
            Self::Sqlite => Arc::new(SqliteDialect::new()),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "oracle" | "oci8" => Ok(Self::Oracle),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(ReconcileError::UnsupportedDialect(s.to_string())),
        }
    }
}

/// Looks a dialect up by driver identifier.
///
/// # Errors
///
/// Returns [`ReconcileError::UnsupportedDialect`] for unknown identifiers.
pub fn dialect_for(id: &str) -> Result<Arc<dyn Dialect>> {
    Ok(id.parse::<DialectKind>()?.dialect())
}

/// One row of a dialect's column catalog query, in the shared shape
/// `NAME, DATA_TYPE, NULLABLE, MAX_LENGTH, RAW_TYPE, DATA_PRECISION,
/// DATA_SCALE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    /// Column name, upper-case.
    pub name: String,
    /// Catalog type name used for classification.
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Character length, if reported.
    pub max_length: Option<i64>,
    /// Full declared type.
    pub raw_type: String,
    /// Numeric precision, if reported.
    pub precision: Option<i64>,
    /// Numeric scale, if reported.
    pub scale: Option<i64>,
}

impl CatalogColumn {
    /// Reads a catalog row.
    ///
    /// # Errors
    ///
    /// Fails when `NAME` or `DATA_TYPE` is missing.
    pub fn from_row(row: &Row) -> std::result::Result<Self, DbError> {
        let name = row
            .text("NAME")
            .ok_or("catalog row has no NAME column")?
            .to_uppercase();
        let data_type = row
            .text("DATA_TYPE")
            .ok_or_else(|| format!("catalog row for {name} has no DATA_TYPE"))?
            .to_string();
        Ok(Self {
            nullable: row.int("NULLABLE").map_or(true, |n| n != 0),
            max_length: row.int("MAX_LENGTH"),
            raw_type: row.text("RAW_TYPE").unwrap_or(&data_type).to_string(),
            precision: row.int("DATA_PRECISION"),
            scale: row.int("DATA_SCALE"),
            name,
            data_type,
        })
    }
}

/// Escapes a string for use inside a single-quoted SQL literal.
#[must_use]
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Length as an `i32`, saturating.
pub(crate) fn clamp_length(length: i64) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}

/// Database-specific type mapping, catalog access and DDL generation.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Which backend this is.
    fn kind(&self) -> DialectKind;

    /// Returns the dialect name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Physical column type for a logical type and length.
    fn physical_type(&self, logical_type: LogicalType, max_length: i32) -> String;

    /// The length a column of this type will actually get. Dialects with a
    /// length ceiling clamp here.
    fn effective_length(&self, _logical_type: LogicalType, max_length: i32) -> i32 {
        max_length
    }

    /// Physical type for a column, reusing the fetched raw type when it came
    /// from this dialect.
    fn column_type(&self, column: &ColumnDefinition) -> String {
        match &column.fetched {
            Some(fetched) if fetched.dialect == self.kind() => fetched.raw.clone(),
            _ => self.physical_type(column.logical_type, column.max_length),
        }
    }

    /// Maps a catalog row to a logical type.
    fn classify(&self, column: &CatalogColumn) -> ObservedType;

    /// Length reported for a catalog column; unbounded types report 0.
    fn observed_length(&self, column: &CatalogColumn) -> i32 {
        column.max_length.map_or(0, clamp_length)
    }

    /// Builds the live view of a catalog row.
    fn live_column(&self, column: &CatalogColumn) -> LiveColumnInfo {
        LiveColumnInfo {
            name: column.name.clone(),
            observed_type: self.classify(column),
            max_length: self.observed_length(column),
            nullable: column.nullable,
            raw_type: column.raw_type.clone(),
            index_name: None,
        }
    }

    /// Normalizes a value read from this database before comparison.
    fn normalize_value(&self, value: Value) -> Value {
        value
    }

    /// Compares two values after normalization.
    fn values_equal(&self, logical_type: LogicalType, a: &Value, b: &Value) -> bool {
        values_equal(
            logical_type,
            &self.normalize_value(a.clone()),
            &self.normalize_value(b.clone()),
        )
    }

    // ------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------

    /// Folds a name to the case the catalog stores unquoted names in.
    fn fold_case(&self, name: &str) -> String {
        name.to_uppercase()
    }

    /// Quotes an identifier after case folding.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", self.fold_case(name))
    }

    /// Quotes a possibly schema-qualified table name.
    fn quote_table(&self, name: &QualifiedName) -> String {
        match &name.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&name.table)
            ),
            None => self.quote_identifier(&name.table),
        }
    }

    /// Quotes a dotted name part by part, e.g. an `OWNER.INDEX` name.
    fn quote_path(&self, path: &str) -> String {
        path.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quoted, comma-separated column list.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ------------------------------------------------------------------
    // Catalog queries
    // ------------------------------------------------------------------

    /// Query returning the session's default schema as its only column, or
    /// `None` when the dialect has a fixed default.
    fn current_schema_sql(&self) -> Option<&'static str>;

    /// Default schema when [`Dialect::current_schema_sql`] is `None`.
    fn fixed_schema(&self) -> &'static str {
        "MAIN"
    }

    /// Query returning one row whose first column counts matching tables.
    fn table_exists_sql(&self, schema: &str, table: &str) -> String;

    /// Column catalog query in the [`CatalogColumn`] shape, ordered by
    /// column position.
    fn columns_sql(&self, schema: &str, table: &str) -> String;

    /// Primary-key query with `NAME` and `CONSTRAINT_NAME`, in key order.
    fn primary_key_sql(&self, schema: &str, table: &str) -> String;

    /// Single-column, non-unique, non-primary index query with
    /// `INDEX_OWNER`, `INDEX_NAME` and `COLUMN_NAME`, ordered by index name.
    fn indexes_sql(&self, schema: &str, table: &str) -> String;

    // ------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------

    /// Column definition: quoted name, type and `NOT NULL` when required.
    fn column_definition(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    /// `CREATE TABLE` plus one `CREATE INDEX` per indexed column.
    fn create_table_sql(&self, definition: &TableDefinition) -> Vec<String> {
        let table = definition.name();
        let mut parts: Vec<String> = definition
            .columns()
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        if !definition.primary_key().is_empty() {
            parts.push(format!(
                "PRIMARY KEY ({})",
                self.column_list(definition.primary_key())
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_table(table),
            parts.join(",\n  ")
        )];
        statements.extend(
            definition
                .columns()
                .iter()
                .filter(|c| c.wants_index)
                .map(|c| self.create_index_sql(table, &c.name)),
        );
        statements
    }

    /// Renames a table within its schema.
    fn rename_table_sql(&self, from: &QualifiedName, to: &QualifiedName) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_table(from),
            self.quote_identifier(&to.table)
        )
    }

    /// Renames a column.
    fn rename_column_sql(&self, table: &QualifiedName, from: &str, to: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_table(table),
            self.quote_identifier(from),
            self.quote_identifier(to)
        )
    }

    /// Adds a column.
    fn add_column_sql(&self, table: &QualifiedName, column: &ColumnDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_table(table),
            self.column_definition(column)
        )
    }

    /// Drops a column.
    fn drop_column_sql(&self, table: &QualifiedName, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_table(table),
            self.quote_identifier(name)
        )
    }

    /// Changes a column's type and, if it differs from `current`, its
    /// nullability.
    fn alter_column_sql(
        &self,
        table: &QualifiedName,
        column: &ColumnDefinition,
        current: &LiveColumnInfo,
    ) -> Result<Vec<String>>;

    /// Name given to a generated single-column index.
    fn index_name(&self, table: &QualifiedName, column: &str) -> String {
        format!("IDX_{}_{}", table.table, column)
    }

    /// Creates a single-column index.
    fn create_index_sql(&self, table: &QualifiedName, column: &str) -> String {
        format!(
            "CREATE INDEX {} ON {} ({})",
            self.quote_identifier(&self.index_name(table, column)),
            self.quote_table(table),
            self.quote_identifier(column)
        )
    }

    /// Drops an index by name.
    fn drop_index_sql(&self, _table: &QualifiedName, index_name: &str) -> String {
        format!("DROP INDEX {}", self.quote_path(index_name))
    }

    /// Adds a primary key.
    fn add_primary_key_sql(&self, table: &QualifiedName, columns: &[String]) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.quote_table(table),
            self.column_list(columns)
        ))
    }

    /// Drops the primary key.
    fn drop_primary_key_sql(
        &self,
        table: &QualifiedName,
        constraint: Option<&str>,
    ) -> Result<String>;

    /// Error for a step this dialect cannot express.
    fn unsupported(&self, operation: &str, table: &QualifiedName) -> ReconcileError {
        ReconcileError::UnsupportedOperation {
            dialect: self.name(),
            operation: operation.to_string(),
            table: table.to_string(),
        }
    }

    /// Renders one step. `table` is the name the table has when the step
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnsupportedOperation`] when the dialect has
    /// no DDL for the step.
    fn generate_sql(&self, table: &QualifiedName, step: &MigrationStep) -> Result<Vec<String>> {
        Ok(match step {
            MigrationStep::CreateTable(definition) => self.create_table_sql(definition),
            MigrationStep::RenameTable { from, to } => vec![self.rename_table_sql(from, to)],
            MigrationStep::RenameColumn { from, to } => {
                vec![self.rename_column_sql(table, from, to)]
            }
            MigrationStep::DropPrimaryKey { constraint } => {
                vec![self.drop_primary_key_sql(table, constraint.as_deref())?]
            }
            MigrationStep::DropIndex {
                index_name,
                table: index_table,
            } => vec![self.drop_index_sql(index_table, index_name)],
            MigrationStep::DropColumn { name } => vec![self.drop_column_sql(table, name)],
            MigrationStep::AddColumn { column } => vec![self.add_column_sql(table, column)],
            MigrationStep::AlterColumnType {
                column, current, ..
            } => self.alter_column_sql(table, column, current)?,
            MigrationStep::AddIndex { column } => vec![self.create_index_sql(table, column)],
            MigrationStep::AddPrimaryKey { columns } => {
                vec![self.add_primary_key_sql(table, columns)?]
            }
        })
    }
}
