//! Oracle dialect.
//!
//! `VARCHAR2` is capped at 4000; longer declared lengths are clamped, and
//! the differ compares against the clamped length so that such columns do
//! not show up as changed on every run.

use crate::error::Result;
use crate::schema::{LiveColumnInfo, ObservedType, QualifiedName};
use crate::types::{ColumnDefinition, LogicalType};
use crate::value::Value;

use super::{CatalogColumn, Dialect, DialectKind, sql_literal};

/// Longest `VARCHAR2` Oracle accepts.
pub const MAX_VARCHAR_LENGTH: i32 = 4000;

/// Oracle dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates a new Oracle dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn physical_type(&self, logical_type: LogicalType, max_length: i32) -> String {
        match logical_type {
            LogicalType::String if max_length > MAX_VARCHAR_LENGTH => {
                format!("VARCHAR2({MAX_VARCHAR_LENGTH})")
            }
            LogicalType::String if max_length > 0 => format!("VARCHAR2({max_length} CHAR)"),
            LogicalType::String => "CLOB".to_string(),
            LogicalType::Integer => "INT".to_string(),
            LogicalType::Float => "BINARY_DOUBLE".to_string(),
            LogicalType::DateTime => "DATE".to_string(),
            LogicalType::Binary => "BLOB".to_string(),
        }
    }

    fn effective_length(&self, logical_type: LogicalType, max_length: i32) -> i32 {
        if logical_type == LogicalType::String {
            max_length.min(MAX_VARCHAR_LENGTH)
        } else {
            max_length
        }
    }

    fn classify(&self, column: &CatalogColumn) -> ObservedType {
        match column.data_type.to_uppercase().as_str() {
            "CHAR" | "NCHAR" | "VARCHAR" | "VARCHAR2" | "NVARCHAR2" | "CLOB" | "NCLOB" => {
                ObservedType::Known(LogicalType::String)
            }
            "NUMBER" if column.precision.is_none() && column.scale == Some(0) => {
                ObservedType::Known(LogicalType::Integer)
            }
            "NUMBER" | "FLOAT" | "BINARY_DOUBLE" | "BINARY_FLOAT" => {
                ObservedType::Known(LogicalType::Float)
            }
            t if t == "DATE" || t.starts_with("TIMESTAMP") => {
                ObservedType::Known(LogicalType::DateTime)
            }
            "BLOB" | "RAW" | "LONG RAW" => ObservedType::Known(LogicalType::Binary),
            _ => ObservedType::Opaque(column.raw_type.clone()),
        }
    }

    fn normalize_value(&self, value: Value) -> Value {
        value.without_offset()
    }

    fn current_schema_sql(&self) -> Option<&'static str> {
        Some("SELECT user FROM dual")
    }

    fn table_exists_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT count(*) AS CNT FROM all_tables WHERE owner = {} AND table_name = {}",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn columns_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT column_name AS NAME, data_type AS DATA_TYPE, \
             CASE nullable WHEN 'Y' THEN 1 ELSE 0 END AS NULLABLE, \
             char_length AS MAX_LENGTH, \
             CASE \
               WHEN data_type IN ('VARCHAR2', 'NVARCHAR2', 'CHAR', 'NCHAR') \
                 THEN data_type || '(' || char_length || \
                      CASE char_used WHEN 'C' THEN ' CHAR' ELSE '' END || ')' \
               WHEN data_type = 'NUMBER' AND data_precision IS NOT NULL \
                 THEN data_type || '(' || data_precision || ',' || data_scale || ')' \
               ELSE data_type \
             END AS RAW_TYPE, \
             data_precision AS DATA_PRECISION, data_scale AS DATA_SCALE \
             FROM all_tab_columns WHERE owner = {} AND table_name = {} \
             ORDER BY column_id",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn primary_key_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT cols.column_name AS NAME, cons.constraint_name AS CONSTRAINT_NAME \
             FROM all_constraints cons \
             JOIN all_cons_columns cols \
               ON cols.owner = cons.owner AND cols.constraint_name = cons.constraint_name \
             WHERE cons.constraint_type = 'P' AND cons.owner = {} AND cons.table_name = {} \
             ORDER BY cols.position",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn indexes_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT min(c.index_owner) AS INDEX_OWNER, c.index_name AS INDEX_NAME, \
             min(c.column_name) AS COLUMN_NAME \
             FROM all_ind_columns c \
             JOIN all_indexes i ON i.owner = c.index_owner AND i.index_name = c.index_name \
             WHERE c.table_owner = {} AND c.table_name = {} AND i.uniqueness = 'NONUNIQUE' \
             GROUP BY c.index_name HAVING count(*) = 1 \
             ORDER BY c.index_name",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn add_column_sql(&self, table: &QualifiedName, column: &ColumnDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD ({})",
            self.quote_table(table),
            self.column_definition(column)
        )
    }

    fn drop_column_sql(&self, table: &QualifiedName, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP ({})",
            self.quote_table(table),
            self.quote_identifier(name)
        )
    }

    fn alter_column_sql(
        &self,
        table: &QualifiedName,
        column: &ColumnDefinition,
        current: &LiveColumnInfo,
    ) -> Result<Vec<String>> {
        let mut definition = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        // MODIFY fails when asked to set the nullability the column already has.
        if current.nullable != column.nullable {
            definition.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        }
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY ({definition})",
            self.quote_table(table)
        )])
    }

    fn add_primary_key_sql(&self, table: &QualifiedName, columns: &[String]) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_table(table),
            self.quote_identifier(&format!("{}_PK", table.table)),
            self.column_list(columns)
        ))
    }

    fn drop_primary_key_sql(
        &self,
        table: &QualifiedName,
        constraint: Option<&str>,
    ) -> Result<String> {
        Ok(match constraint {
            Some(name) => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_table(table),
                self.quote_identifier(name)
            ),
            None => format!("ALTER TABLE {} DROP PRIMARY KEY", self.quote_table(table)),
        })
    }
}
