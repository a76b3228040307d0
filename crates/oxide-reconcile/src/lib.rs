//! Declarative table reconciliation for SQL databases.
//!
//! `oxide-reconcile` takes the table you want and the database you have, and
//! computes the smallest set of DDL statements that turns one into the
//! other:
//!
//! - Definitions are declarative: columns with a logical type, length,
//!   nullability and index flag, a primary key, and optional former names
//!   for renames
//! - The live table is read from the database catalog, not from a history
//!   of applied migrations
//! - SQL generation is dialect-aware (PostgreSQL, Oracle, MySQL, SQLite)
//!
//! # Architecture
//!
//! - **Introspector** - Reads columns, primary key and single-column indexes
//! - **Resolver** - Finds the live table, following former names
//! - **Differ** - Compares desired and live structure into a [`MigrationPlan`]
//! - **Executor** - Renders the plan to DDL and runs it in order
//! - **Dialect** - Database-specific types, catalog queries and DDL
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_reconcile::prelude::*;
//!
//! let conn = SqliteConnection::connect("sqlite:app.db").await?;
//! let reconciler = Reconciler::new(conn)?;
//!
//! let orders = TableDefinition::new(
//!     "orders",
//!     vec![
//!         ColumnDefinition::string("id", 40),
//!         ColumnDefinition::new("amount", LogicalType::Float).not_null(),
//!         ColumnDefinition::new("created", LogicalType::DateTime).indexed(),
//!     ],
//!     vec!["id".to_string()],
//! )?
//! .with_former_names(["orders_v1"])?;
//!
//! let report = reconciler.reconcile(&orders).await?;
//! for sql in &report.statements {
//!     println!("{sql}");
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what would change
//! oxide-reconcile plan orders.def --table orders
//!
//! # Apply it
//! oxide-reconcile apply orders.def --table orders --former orders_v1
//!
//! # Dump the live structure of a table
//! oxide-reconcile inspect orders
//! ```

pub mod connection;
pub mod dialect;
pub mod differ;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod plan;
pub mod reconciler;
pub mod resolver;
pub mod schema;
pub mod script;
pub mod types;
pub mod value;

pub use error::{ReconcileError, Result};
pub use plan::{MigrationPlan, MigrationStep};
pub use reconciler::{ReconcileOptions, ReconcileReport, Reconciler};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::connection::{Connection, Row, SqliteConnection};
    pub use crate::dialect::{
        Dialect, DialectKind, MySqlDialect, OracleDialect, PostgresDialect, SqliteDialect,
        dialect_for,
    };
    pub use crate::differ::SchemaDiffer;
    pub use crate::error::{DbError, ReconcileError, Result};
    pub use crate::executor::PlanExecutor;
    pub use crate::introspect::Introspector;
    pub use crate::plan::{MigrationPlan, MigrationStep};
    pub use crate::reconciler::{ReconcileOptions, ReconcileReport, Reconciler};
    pub use crate::resolver::{Resolution, resolve_source};
    pub use crate::schema::{
        LiveColumnInfo, LiveTableInfo, ObservedType, QualifiedName, TableDefinition,
    };
    pub use crate::script::parse_definition;
    pub use crate::types::{ColumnDefinition, LogicalType, columns_equal};
    pub use crate::value::{Value, values_equal};
}
