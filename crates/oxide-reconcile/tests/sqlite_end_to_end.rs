//! End-to-end reconciliation against a file-backed SQLite database.

use oxide_reconcile::prelude::*;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Reconciler<SqliteConnection> {
    let url = format!("sqlite:{}", dir.path().join("app.db").display());
    let conn = SqliteConnection::connect(&url).await.unwrap();
    Reconciler::new(conn).unwrap()
}

fn orders(note: LogicalType) -> TableDefinition {
    TableDefinition::new(
        "orders",
        vec![
            ColumnDefinition::new("id", LogicalType::Integer).not_null(),
            ColumnDefinition::new("amt", LogicalType::Float),
            ColumnDefinition::new("note", note),
        ],
        vec!["id".to_string()],
    )
    .unwrap()
}

#[tokio::test]
async fn orders_create_then_alter() {
    let dir = tempfile::tempdir().unwrap();
    let r = open(&dir).await;

    let first = r.reconcile(&orders(LogicalType::String)).await.unwrap();
    assert_eq!(first.plan.labels(), vec!["CreateTable(ORDERS)"]);

    let again = r.plan(&orders(LogicalType::String)).await.unwrap();
    assert!(again.is_empty(), "{:?}", again.labels());

    let changed = r.plan(&orders(LogicalType::Integer)).await.unwrap();
    assert_eq!(changed.labels(), vec!["AlterColumnType(NOTE)"]);

    // SQLite cannot change a column type in place; nothing is executed.
    let err = r.reconcile(&orders(LogicalType::Integer)).await.unwrap_err();
    assert!(matches!(err, ReconcileError::UnsupportedOperation { .. }));
    let live = r
        .inspect(&QualifiedName::new(None, "ORDERS"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        live.column("NOTE").unwrap().observed_type,
        ObservedType::Known(LogicalType::String)
    );
}

#[tokio::test]
async fn state_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    open(&dir)
        .await
        .reconcile(&orders(LogicalType::String))
        .await
        .unwrap();

    let reopened = open(&dir).await;
    let live = reopened
        .inspect(&QualifiedName::parse("orders").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.primary_key, vec!["ID"]);
    assert_eq!(live.columns.len(), 3);
    assert!(reopened
        .reconcile(&orders(LogicalType::String))
        .await
        .unwrap()
        .is_noop());
}

#[tokio::test]
async fn script_rename_and_evolve() {
    let dir = tempfile::tempdir().unwrap();
    let r = open(&dir).await;

    let v1 = parse_definition(
        "customers",
        "id int\nname str(80) not null index\nemail str(120)\nprimary key(id)",
    )
    .unwrap();
    r.reconcile(&v1).await.unwrap();

    let v2 = parse_definition(
        "clients",
        "id int\nname str(80) not null index\nmail str(120) former email\nscore float\nprimary key(id)",
    )
    .unwrap()
    .with_former_names(["customers"])
    .unwrap();

    let report = r.reconcile(&v2).await.unwrap();
    assert_eq!(
        report.plan.labels(),
        vec![
            "RenameTable(CUSTOMERS)",
            "RenameColumn(EMAIL)",
            "AddColumn(SCORE)",
        ]
    );
    assert!(r.reconcile(&v2).await.unwrap().is_noop());
    assert!(r
        .inspect(&QualifiedName::new(None, "CUSTOMERS"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn dropped_column_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let r = open(&dir).await;

    let v1 = parse_definition("events", "id int\nkind str(20) index\npayload bytea\nprimary key(id)")
        .unwrap();
    r.reconcile(&v1).await.unwrap();

    let v2 = parse_definition("events", "id int\nkind str(20)\nprimary key(id)").unwrap();
    let report = r.reconcile(&v2).await.unwrap();
    assert_eq!(
        report.plan.labels(),
        vec!["DropIndex(IDX_EVENTS_KIND)", "DropColumn(PAYLOAD)"]
    );
    assert!(r.reconcile(&v2).await.unwrap().is_noop());
}
