//! PostgreSQL dialect.
//!
//! Unquoted identifiers fold to lower case in PostgreSQL, so names are
//! lowered before quoting. Catalog comparisons use `upper()` on both sides.

use crate::error::Result;
use crate::schema::{LiveColumnInfo, ObservedType, QualifiedName};
use crate::types::{ColumnDefinition, LogicalType};

use super::{CatalogColumn, Dialect, DialectKind, sql_literal};

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn physical_type(&self, logical_type: LogicalType, max_length: i32) -> String {
        match logical_type {
            LogicalType::String if max_length > 0 => {
                format!("character varying({max_length})")
            }
            LogicalType::String => "text".to_string(),
            LogicalType::Integer => "integer".to_string(),
            LogicalType::Float => "double precision".to_string(),
            LogicalType::DateTime => "timestamp without time zone".to_string(),
            LogicalType::Binary => "bytea".to_string(),
        }
    }

    fn classify(&self, column: &CatalogColumn) -> ObservedType {
        match column.data_type.to_lowercase().as_str() {
            "text" | "character varying" | "character" => ObservedType::Known(LogicalType::String),
            "integer" | "bigint" | "smallint" => ObservedType::Known(LogicalType::Integer),
            "timestamp without time zone" | "timestamp with time zone" | "date" => {
                ObservedType::Known(LogicalType::DateTime)
            }
            "double precision" | "real" | "numeric" => ObservedType::Known(LogicalType::Float),
            "bytea" => ObservedType::Known(LogicalType::Binary),
            _ => ObservedType::Opaque(column.raw_type.clone()),
        }
    }

    fn fold_case(&self, name: &str) -> String {
        name.to_lowercase()
    }

    fn current_schema_sql(&self) -> Option<&'static str> {
        Some("SELECT upper(current_schema())")
    }

    fn table_exists_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT count(*) AS CNT FROM information_schema.tables \
             WHERE upper(table_schema) = {} AND upper(table_name) = {}",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn columns_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(c.column_name) AS NAME, c.data_type AS DATA_TYPE, \
             CASE WHEN c.is_nullable = 'YES' THEN 1 ELSE 0 END AS NULLABLE, \
             c.character_maximum_length AS MAX_LENGTH, \
             format_type(a.atttypid, a.atttypmod) AS RAW_TYPE, \
             c.numeric_precision AS DATA_PRECISION, c.numeric_scale AS DATA_SCALE \
             FROM information_schema.columns c \
             JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema \
             JOIN pg_catalog.pg_class t ON t.relnamespace = n.oid AND t.relname = c.table_name \
             JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name \
             WHERE upper(c.table_schema) = {} AND upper(c.table_name) = {} \
             ORDER BY c.ordinal_position",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn primary_key_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(a.attname) AS NAME, upper(con.conname) AS CONSTRAINT_NAME \
             FROM pg_catalog.pg_constraint con \
             JOIN pg_catalog.pg_class t ON t.oid = con.conrelid \
             JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
             JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, pos) ON true \
             JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
             WHERE con.contype = 'p' AND upper(n.nspname) = {} AND upper(t.relname) = {} \
             ORDER BY k.pos",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn indexes_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(ns.nspname) AS INDEX_OWNER, upper(i.relname) AS INDEX_NAME, \
             upper(a.attname) AS COLUMN_NAME \
             FROM pg_catalog.pg_index ix \
             JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
             JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_catalog.pg_namespace tn ON tn.oid = t.relnamespace \
             JOIN pg_catalog.pg_namespace ns ON ns.oid = i.relnamespace \
             JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ix.indkey[0] \
             WHERE ix.indnatts = 1 AND NOT ix.indisprimary AND NOT ix.indisunique \
             AND upper(tn.nspname) = {} AND upper(t.relname) = {} \
             ORDER BY i.relname",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn alter_column_sql(
        &self,
        table: &QualifiedName,
        column: &ColumnDefinition,
        current: &LiveColumnInfo,
    ) -> Result<Vec<String>> {
        let name = self.quote_identifier(&column.name);
        let ty = self.column_type(column);
        let mut actions = vec![format!("ALTER COLUMN {name} TYPE {ty} USING {name}::{ty}")];
        if current.nullable != column.nullable {
            let change = if column.nullable { "DROP" } else { "SET" };
            actions.push(format!("ALTER COLUMN {name} {change} NOT NULL"));
        }
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.quote_table(table),
            actions.join(", ")
        )])
    }

    fn create_index_sql(&self, table: &QualifiedName, column: &str) -> String {
        format!(
            "CREATE INDEX ON {} ({})",
            self.quote_table(table),
            self.quote_identifier(column)
        )
    }

    fn drop_primary_key_sql(
        &self,
        table: &QualifiedName,
        constraint: Option<&str>,
    ) -> Result<String> {
        let constraint =
            constraint.ok_or_else(|| self.unsupported("drop an unnamed primary key", table))?;
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_table(table),
            self.quote_identifier(constraint)
        ))
    }
}
