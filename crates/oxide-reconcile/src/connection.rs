//! The database capability the reconciler runs against.
//!
//! Reconciliation only needs two things from a database: run a statement,
//! and run a query returning rows. [`Connection`] captures exactly that, so
//! any driver can be plugged in. [`SqliteConnection`] is the bundled
//! implementation on top of a sqlx pool.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::DbError;
use crate::value::Value;

/// A result row: ordered `(NAME, value)` pairs with upper-case names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    #[must_use]
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a column in place.
    pub fn push(&mut self, name: &str, value: Value) {
        self.values.push((name.to_uppercase(), value));
    }

    /// Looks a column up by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = name.to_uppercase();
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// The first column's value.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.values.first().map(|(_, v)| v)
    }

    /// Text value of a column; `None` if absent, NULL or not text.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer value of a column; see [`Value::as_i64`].
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A handle that can execute statements and run queries.
///
/// Implementations must be shareable across tasks. Each call is independent;
/// the reconciler never opens a transaction.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Dialect identifier, e.g. `"postgres"` or `"sqlite3"`.
    fn dialect_name(&self) -> &str;

    /// Executes a statement that returns no rows.
    async fn execute(&self, sql: &str) -> Result<(), DbError>;

    /// Runs a query and returns all rows.
    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError>;
}

/// [`Connection`] over a sqlx SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to a SQLite URL such as `sqlite:db.sqlite3` or
    /// `sqlite::memory:`, creating the file if missing.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options = url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, DbError> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_string();
            match kind.as_str() {
                "INTEGER" => Value::Integer(row.try_get_unchecked(i)?),
                "REAL" => Value::Float(row.try_get_unchecked(i)?),
                "BLOB" => Value::Binary(row.try_get_unchecked(i)?),
                _ => Value::String(row.try_get_unchecked(i)?),
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl Connection for SqliteConnection {
    fn dialect_name(&self) -> &str {
        "sqlite3"
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        debug!(sql = %sql, "Executing SQL");
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        debug!(sql = %sql, "Querying");
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}
