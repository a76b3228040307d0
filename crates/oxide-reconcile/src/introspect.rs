//! Reads live table structure from the database catalog.

use tracing::{debug, warn};

use crate::connection::{Connection, Row};
use crate::dialect::{CatalogColumn, Dialect};
use crate::error::{ReconcileError, Result};
use crate::schema::{LiveTableInfo, QualifiedName};
use crate::value::Value;

/// Catalog reader for one connection and dialect.
///
/// Every query failure is reported as [`ReconcileError::Introspection`]
/// carrying the failing statement. A table without columns in the catalog
/// does not exist; that is not an error.
#[derive(Clone, Copy)]
pub struct Introspector<'a> {
    conn: &'a dyn Connection,
    dialect: &'a dyn Dialect,
}

impl<'a> Introspector<'a> {
    /// Creates an introspector.
    #[must_use]
    pub const fn new(conn: &'a dyn Connection, dialect: &'a dyn Dialect) -> Self {
        Self { conn, dialect }
    }

    async fn run(&self, table: &QualifiedName, sql: String) -> Result<Vec<Row>> {
        match self.conn.query(&sql).await {
            Ok(rows) => Ok(rows),
            Err(source) => Err(ReconcileError::introspection(table.to_string(), sql, source)),
        }
    }

    /// The session's default schema, upper-case.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Introspection`] if the query fails or
    /// returns no text.
    pub async fn default_schema(&self, table: &QualifiedName) -> Result<String> {
        let Some(sql) = self.dialect.current_schema_sql() else {
            return Ok(self.dialect.fixed_schema().to_string());
        };
        let rows = self.run(table, sql.to_string()).await?;
        rows.first()
            .and_then(Row::first)
            .and_then(Value::as_str)
            .map(str::to_uppercase)
            .ok_or_else(|| {
                ReconcileError::introspection(
                    table.to_string(),
                    sql,
                    "default schema query returned no name",
                )
            })
    }

    /// Schema the table lives in: its own, or the default.
    ///
    /// # Errors
    ///
    /// See [`Introspector::default_schema`].
    pub async fn effective_schema(&self, table: &QualifiedName) -> Result<String> {
        match &table.schema {
            Some(schema) => Ok(schema.clone()),
            None => self.default_schema(table).await,
        }
    }

    /// Returns true if the table exists.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Introspection`] if a catalog query fails.
    pub async fn table_exists(&self, table: &QualifiedName) -> Result<bool> {
        let schema = self.effective_schema(table).await?;
        let sql = self.dialect.table_exists_sql(&schema, &table.table);
        let rows = self.run(table, sql).await?;
        let count = rows.first().and_then(Row::first).and_then(Value::as_i64);
        Ok(count.unwrap_or(0) > 0)
    }

    /// Reads columns, primary key and single-column indexes of a table.
    ///
    /// Returns `Ok(None)` when the table does not exist. When several
    /// indexes cover the same column, the first by name is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Introspection`] if a catalog query fails or
    /// returns rows of the wrong shape.
    pub async fn fetch(&self, table: &QualifiedName) -> Result<Option<LiveTableInfo>> {
        let schema = self.effective_schema(table).await?;

        let sql = self.dialect.columns_sql(&schema, &table.table);
        let rows = self.run(table, sql.clone()).await?;
        if rows.is_empty() {
            debug!(table = %table, "Table does not exist");
            return Ok(None);
        }
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let catalog = CatalogColumn::from_row(row)
                .map_err(|e| ReconcileError::introspection(table.to_string(), &sql, e))?;
            columns.push(self.dialect.live_column(&catalog));
        }

        let sql = self.dialect.primary_key_sql(&schema, &table.table);
        let rows = self.run(table, sql).await?;
        let primary_key: Vec<String> = rows
            .iter()
            .filter_map(|r| r.text("NAME"))
            .map(str::to_uppercase)
            .collect();
        let primary_key_name = rows
            .first()
            .and_then(|r| r.text("CONSTRAINT_NAME"))
            .map(str::to_uppercase);

        let sql = self.dialect.indexes_sql(&schema, &table.table);
        let rows = self.run(table, sql).await?;
        for row in &rows {
            let (Some(column), Some(index)) = (row.text("COLUMN_NAME"), row.text("INDEX_NAME"))
            else {
                continue;
            };
            let column = column.to_uppercase();
            let index = index.to_uppercase();
            // Indexes on expressions name no table column.
            let Some(live) = columns.iter_mut().find(|c| c.name == column) else {
                continue;
            };
            if let Some(existing) = &live.index_name {
                warn!(
                    table = %table,
                    column = %column,
                    kept = %existing,
                    ignored = %index,
                    "Column has more than one single-column index"
                );
                continue;
            }
            let owner = row
                .text("INDEX_OWNER")
                .map_or_else(|| schema.clone(), str::to_uppercase);
            live.index_name = Some(if table.schema.is_some() || owner != schema {
                format!("{owner}.{index}")
            } else {
                index
            });
        }

        debug!(
            table = %table,
            schema = %schema,
            columns = columns.len(),
            "Introspected table"
        );
        Ok(Some(LiveTableInfo {
            name: table.clone(),
            columns,
            primary_key,
            primary_key_name,
        }))
    }
}
