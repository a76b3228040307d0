#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use oxide_reconcile::connection::{Connection, Row};
use oxide_reconcile::error::DbError;
use oxide_reconcile::value::Value;

/// Catalog rows of one table, in the shapes the dialects query for.
#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub columns: Vec<Row>,
    pub primary_key: Vec<Row>,
    pub indexes: Vec<Row>,
}

impl FakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, row: Row) -> Self {
        self.columns.push(row);
        self
    }

    pub fn primary_key(mut self, constraint: &str, columns: &[&str]) -> Self {
        for name in columns {
            self.primary_key.push(
                Row::new()
                    .with("NAME", text(name))
                    .with("CONSTRAINT_NAME", text(constraint)),
            );
        }
        self
    }

    pub fn index(mut self, owner: &str, index: &str, column: &str) -> Self {
        self.indexes.push(
            Row::new()
                .with("INDEX_OWNER", text(owner))
                .with("INDEX_NAME", text(index))
                .with("COLUMN_NAME", text(column)),
        );
        self
    }
}

pub fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

/// A column catalog row.
pub fn catalog_column(
    name: &str,
    data_type: &str,
    nullable: bool,
    max_length: Option<i64>,
    raw_type: &str,
) -> Row {
    Row::new()
        .with("NAME", text(name))
        .with("DATA_TYPE", text(data_type))
        .with("NULLABLE", Value::Integer(i64::from(nullable)))
        .with("MAX_LENGTH", max_length.map_or(Value::Null, Value::Integer))
        .with("RAW_TYPE", text(raw_type))
        .with("DATA_PRECISION", Value::Null)
        .with("DATA_SCALE", Value::Null)
}

/// In-memory database that answers catalog queries from fixed tables and
/// records every executed statement without applying it.
pub struct FakeDatabase {
    dialect: &'static str,
    schema: &'static str,
    tables: HashMap<String, FakeTable>,
    executed: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn new(dialect: &'static str, schema: &'static str) -> Self {
        Self {
            dialect,
            schema,
            tables: HashMap::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn table(mut self, name: &str, table: FakeTable) -> Self {
        self.tables.insert(name.to_uppercase(), table);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn lookup(&self, sql: &str) -> Option<&FakeTable> {
        self.tables
            .iter()
            .find(|(name, _)| sql.contains(&format!("'{name}'")))
            .map(|(_, table)| table)
    }
}

#[async_trait]
impl Connection for FakeDatabase {
    fn dialect_name(&self) -> &str {
        self.dialect
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, DbError> {
        let table = self.lookup(sql);
        let rows = if sql.contains("AS CNT") {
            let count = i64::from(table.is_some());
            vec![Row::new().with("CNT", Value::Integer(count))]
        } else if sql.contains("AS RAW_TYPE") {
            table.map(|t| t.columns.clone()).unwrap_or_default()
        } else if sql.contains("AS INDEX_OWNER") {
            table.map(|t| t.indexes.clone()).unwrap_or_default()
        } else if sql.contains("AS CONSTRAINT_NAME") {
            table.map(|t| t.primary_key.clone()).unwrap_or_default()
        } else {
            vec![Row::new().with("SCHEMA", text(self.schema))]
        };
        Ok(rows)
    }
}
