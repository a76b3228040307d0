//! Finds the live table a definition should be reconciled against.

use tracing::{debug, info};

use crate::error::{ReconcileError, Result};
use crate::introspect::Introspector;
use crate::schema::{QualifiedName, TableDefinition};

/// Where a definition's data currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The table exists under its current name.
    Current(QualifiedName),
    /// The table exists under a former name and must be renamed.
    Former(QualifiedName),
    /// Neither the current nor any former name exists.
    Absent,
}

impl Resolution {
    /// The live name to introspect, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&QualifiedName> {
        match self {
            Self::Current(name) | Self::Former(name) => Some(name),
            Self::Absent => None,
        }
    }
}

/// Resolves the source table for `definition`.
///
/// Former names are probed in order and the first existing one wins,
/// unless the current name also exists: two live candidates are ambiguous.
/// Without an existing former name the current name is used, and if that
/// does not exist either the table must be created. A former name that
/// only spells out the default schema of the current name is the same
/// table and is skipped.
///
/// # Errors
///
/// Returns [`ReconcileError::AmbiguousFormerName`] for duplicated names or
/// when a former and the current name both exist, and
/// [`ReconcileError::Introspection`] if probing fails.
pub async fn resolve_source(
    introspector: &Introspector<'_>,
    definition: &TableDefinition,
) -> Result<Resolution> {
    definition.check_former_names()?;
    let current = definition.name();

    for former in definition.former_names() {
        if same_table(introspector, former, current).await? {
            debug!(former = %former, table = %current, "Former name is the current table");
            continue;
        }
        if !introspector.table_exists(former).await? {
            continue;
        }
        if introspector.table_exists(current).await? {
            return Err(ReconcileError::AmbiguousFormerName {
                target: current.to_string(),
                name: former.to_string(),
                reason: "both the former and the current table exist".to_string(),
            });
        }
        info!(from = %former, to = %current, "Found table under former name");
        return Ok(Resolution::Former(former.clone()));
    }

    if introspector.table_exists(current).await? {
        debug!(table = %current, "Found table under current name");
        Ok(Resolution::Current(current.clone()))
    } else {
        debug!(table = %current, "Table does not exist yet");
        Ok(Resolution::Absent)
    }
}

/// True when both names address one table once the default schema is
/// filled in.
async fn same_table(
    introspector: &Introspector<'_>,
    a: &QualifiedName,
    b: &QualifiedName,
) -> Result<bool> {
    if a.table != b.table || a.schema == b.schema {
        return Ok(a == b);
    }
    Ok(introspector.effective_schema(a).await? == introspector.effective_schema(b).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, SqliteConnection};
    use crate::dialect::SqliteDialect;
    use crate::types::{ColumnDefinition, LogicalType};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup(tables: &[&str]) -> SqliteConnection {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        let conn = SqliteConnection::new(pool);
        for table in tables {
            conn.execute(&format!("CREATE TABLE {table} (id INTEGER)"))
                .await
                .unwrap();
        }
        conn
    }

    fn orders(former: &[&str]) -> TableDefinition {
        TableDefinition::new(
            "orders",
            vec![ColumnDefinition::new("id", LogicalType::Integer)],
            vec![],
        )
        .unwrap()
        .with_former_names(former)
        .unwrap()
    }

    async fn resolve(tables: &[&str], former: &[&str]) -> Result<Resolution> {
        let conn = setup(tables).await;
        let dialect = SqliteDialect::new();
        let introspector = Introspector::new(&conn, &dialect);
        resolve_source(&introspector, &orders(former)).await
    }

    #[tokio::test]
    async fn test_absent_table() {
        assert_eq!(resolve(&[], &["orders_v1"]).await.unwrap(), Resolution::Absent);
    }

    #[tokio::test]
    async fn test_current_name() {
        let resolution = resolve(&["orders"], &["orders_v1"]).await.unwrap();
        assert_eq!(resolution, Resolution::Current(QualifiedName::new(None, "ORDERS")));
    }

    #[tokio::test]
    async fn test_first_existing_former_name_wins() {
        let resolution = resolve(&["orders_v1", "orders_v2"], &["orders_v2", "orders_v1"])
            .await
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Former(QualifiedName::new(None, "ORDERS_V2"))
        );
        assert_eq!(resolution.source().unwrap().table, "ORDERS_V2");
    }

    #[tokio::test]
    async fn test_schema_qualified_spelling_of_current_name() {
        let resolution = resolve(&["orders"], &["main.orders"]).await.unwrap();
        assert_eq!(resolution, Resolution::Current(QualifiedName::new(None, "ORDERS")));
    }

    #[tokio::test]
    async fn test_former_name_in_other_schema_is_distinct() {
        let conn = setup(&["orders"]).await;
        conn.execute("ATTACH DATABASE ':memory:' AS archive")
            .await
            .unwrap();
        conn.execute("CREATE TABLE archive.orders (id INTEGER)")
            .await
            .unwrap();
        let dialect = SqliteDialect::new();
        let introspector = Introspector::new(&conn, &dialect);

        let err = resolve_source(&introspector, &orders(&["archive.orders"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::AmbiguousFormerName { .. }));
    }

    #[tokio::test]
    async fn test_former_and_current_both_exist() {
        let err = resolve(&["orders", "orders_v1"], &["orders_v1"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::AmbiguousFormerName { ref name, .. } if name == "ORDERS_V1"
        ));
    }
}
