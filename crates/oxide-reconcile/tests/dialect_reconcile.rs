//! Reconciliation against the server dialects.
//!
//! A fake database answers the catalog queries of PostgreSQL, Oracle and
//! MySQL from fixed tables and records the DDL it is asked to run.

mod common;

use common::{FakeDatabase, FakeTable, catalog_column, text};
use oxide_reconcile::prelude::*;

fn reconciler(db: FakeDatabase) -> Reconciler<FakeDatabase> {
    Reconciler::new(db).unwrap()
}

fn pg_orders() -> FakeTable {
    FakeTable::new()
        .column(catalog_column(
            "ID",
            "character varying",
            false,
            Some(40),
            "character varying(40)",
        ))
        .column(catalog_column("NOTE", "text", true, None, "text"))
        .column(catalog_column("QTY", "integer", true, None, "integer"))
        .column(catalog_column(
            "CREATED",
            "timestamp without time zone",
            true,
            None,
            "timestamp without time zone",
        ))
        .primary_key("ORDERS_PKEY", &["ID"])
        .index("PUBLIC", "IDX_ORDERS_QTY", "QTY")
}

const ORDERS_SCRIPT: &str = "
id str(40)
note str
qty int index
created date
primary key(id)
";

// =============================================================================
// PostgreSQL
// =============================================================================

#[tokio::test]
async fn postgres_matching_table_is_noop() {
    let r = reconciler(FakeDatabase::new("postgres", "PUBLIC").table("orders", pg_orders()));
    let definition = parse_definition("orders", ORDERS_SCRIPT).unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    // NOTE is unbounded on both sides: -1 declared, 0 observed.
    assert!(report.is_noop(), "{:?}", report.plan.labels());
    assert!(r.connection().executed().is_empty());
}

#[tokio::test]
async fn postgres_creates_missing_table() {
    let r = reconciler(FakeDatabase::new("postgres", "PUBLIC"));
    let definition = parse_definition("orders", ORDERS_SCRIPT).unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    assert_eq!(report.plan.labels(), vec!["CreateTable(ORDERS)"]);
    let executed = r.connection().executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[0].starts_with("CREATE TABLE \"orders\""));
    assert!(executed[0].contains("\"id\" character varying(40) NOT NULL"));
    assert!(executed[0].contains("PRIMARY KEY (\"id\")"));
    assert!(executed[1].contains("(\"qty\")"));
}

#[tokio::test]
async fn unbounded_string_key_gets_default_length() {
    let r = reconciler(FakeDatabase::new("postgres", "PUBLIC"));
    let definition = parse_definition("codes", "code str\nlabel str\nprimary key(code)").unwrap();

    r.reconcile(&definition).await.unwrap();

    let executed = r.connection().executed();
    assert!(executed[0].contains("\"code\" character varying(300) NOT NULL"));
    assert!(executed[0].contains("\"label\" text"));
}

#[tokio::test]
async fn primary_key_is_dropped_before_it_is_added() {
    let live = FakeTable::new()
        .column(catalog_column("ID", "integer", false, None, "integer"))
        .column(catalog_column(
            "CODE",
            "character varying",
            false,
            Some(10),
            "character varying(10)",
        ))
        .primary_key("ORDERS_PKEY", &["ID"]);
    let r = reconciler(FakeDatabase::new("postgres", "PUBLIC").table("orders", live));
    let definition = parse_definition("orders", "id int\ncode str(10)\nprimary key(id,code)").unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    assert_eq!(
        report.plan.labels(),
        vec!["DropPrimaryKey", "AddPrimaryKey(ID,CODE)"]
    );
    assert_eq!(
        r.connection().executed(),
        vec![
            "ALTER TABLE \"orders\" DROP CONSTRAINT \"orders_pkey\"",
            "ALTER TABLE \"orders\" ADD PRIMARY KEY (\"id\", \"code\")",
        ]
    );
}

#[tokio::test]
async fn changed_type_alters_column_and_index_follows() {
    let r = reconciler(FakeDatabase::new("postgres", "PUBLIC").table("orders", pg_orders()));
    let definition = parse_definition(
        "orders",
        "id str(40)\nnote str(200) not null index\nqty int\ncreated date\nprimary key(id)",
    )
    .unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    assert_eq!(
        report.plan.labels(),
        vec![
            "DropIndex(IDX_ORDERS_QTY)",
            "AlterColumnType(NOTE)",
            "AddIndex(NOTE)",
        ]
    );
    let executed = r.connection().executed();
    assert!(executed[1].contains("ALTER COLUMN \"note\" TYPE character varying(200)"));
    assert!(executed[1].contains("ALTER COLUMN \"note\" SET NOT NULL"));
}

#[tokio::test]
async fn column_is_renamed_from_former_name() {
    let live = FakeTable::new()
        .column(catalog_column("ID", "integer", false, None, "integer"))
        .column(catalog_column("REMARK", "text", true, None, "text"))
        .primary_key("ORDERS_PKEY", &["ID"]);
    let r = reconciler(FakeDatabase::new("postgres", "PUBLIC").table("orders", live));
    let definition =
        parse_definition("orders", "id int\nnote str former remark\nprimary key(id)").unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    assert_eq!(report.plan.labels(), vec!["RenameColumn(REMARK)"]);
    assert_eq!(
        r.connection().executed(),
        vec!["ALTER TABLE \"orders\" RENAME COLUMN \"remark\" TO \"note\""]
    );
}

#[tokio::test]
async fn unknown_dialect_is_rejected() {
    let err = Reconciler::new(FakeDatabase::new("db2", "X")).err().unwrap();
    assert!(matches!(err, ReconcileError::UnsupportedDialect(ref d) if d == "db2"));
}

// =============================================================================
// Oracle
// =============================================================================

fn oracle_integer(name: &str) -> Row {
    Row::new()
        .with("NAME", text(name))
        .with("DATA_TYPE", text("NUMBER"))
        .with("NULLABLE", Value::Integer(0))
        .with("MAX_LENGTH", Value::Integer(0))
        .with("RAW_TYPE", text("NUMBER"))
        .with("DATA_PRECISION", Value::Null)
        .with("DATA_SCALE", Value::Integer(0))
}

#[tokio::test]
async fn oracle_long_string_is_clamped_and_stable() {
    let live = FakeTable::new()
        .column(oracle_integer("ID"))
        .column(catalog_column(
            "NOTE",
            "VARCHAR2",
            true,
            Some(4000),
            "VARCHAR2(4000 CHAR)",
        ))
        .primary_key("ORDERS_PK", &["ID"]);
    let r = reconciler(FakeDatabase::new("oracle", "APP").table("orders", live));
    let definition = parse_definition("orders", "id int\nnote str(5000)\nprimary key(id)").unwrap();

    let report = r.reconcile(&definition).await.unwrap();
    assert!(report.is_noop(), "{:?}", report.plan.labels());
}

#[tokio::test]
async fn oracle_create_clamps_varchar() {
    let r = reconciler(FakeDatabase::new("oracle", "APP"));
    let definition = parse_definition("invoices", "id int\nnote str(5000)\nprimary key(id)").unwrap();

    r.reconcile(&definition).await.unwrap();

    let executed = r.connection().executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("\"NOTE\" VARCHAR2(4000)"));
    assert!(!executed[0].contains("5000"));
}

#[tokio::test]
async fn oracle_drops_primary_key_by_constraint_name() {
    let live = FakeTable::new()
        .column(oracle_integer("ID"))
        .column(oracle_integer("LINE"))
        .primary_key("SYS_C0012", &["ID"]);
    let r = reconciler(FakeDatabase::new("oracle", "APP").table("items", live));
    let definition = parse_definition("items", "id int not null\nline\nprimary key(id,line)").unwrap();

    r.reconcile(&definition).await.unwrap();

    let executed = r.connection().executed();
    assert_eq!(executed[0], "ALTER TABLE \"ITEMS\" DROP CONSTRAINT \"SYS_C0012\"");
    assert!(executed[1].contains("PRIMARY KEY (\"ID\", \"LINE\")"));
}

// =============================================================================
// MySQL
// =============================================================================

fn mysql_orders() -> FakeTable {
    FakeTable::new()
        .column(catalog_column("ID", "bigint", false, None, "bigint"))
        .column(catalog_column("NOTE", "text", true, Some(65535), "text"))
        .primary_key("PRIMARY", &["ID"])
}

const MYSQL_SCRIPT: &str = "id int\nnote str\nprimary key(id)";

#[tokio::test]
async fn mysql_text_length_counts_as_unbounded() {
    let r = reconciler(FakeDatabase::new("mysql", "SHOP").table("orders", mysql_orders()));
    let definition = parse_definition("orders", MYSQL_SCRIPT).unwrap();

    assert!(r.plan(&definition).await.unwrap().is_empty());
}

#[tokio::test]
async fn first_existing_former_name_is_renamed() {
    let db = FakeDatabase::new("mysql", "SHOP")
        .table("orders_v1", mysql_orders())
        .table("orders_v2", mysql_orders());
    let r = reconciler(db);
    let definition = parse_definition("orders", MYSQL_SCRIPT)
        .unwrap()
        .with_former_names(["orders_v2", "orders_v1"])
        .unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    assert_eq!(report.plan.labels(), vec!["RenameTable(ORDERS_V2)"]);
    assert_eq!(
        r.connection().executed(),
        vec!["RENAME TABLE `ORDERS_V2` TO `ORDERS`"]
    );
}

#[tokio::test]
async fn former_and_current_table_both_existing_is_an_error() {
    let db = FakeDatabase::new("mysql", "SHOP")
        .table("orders", mysql_orders())
        .table("orders_v1", mysql_orders());
    let r = reconciler(db);
    let definition = parse_definition("orders", MYSQL_SCRIPT)
        .unwrap()
        .with_former_names(["orders_v1"])
        .unwrap();

    let err = r.reconcile(&definition).await.unwrap_err();

    assert!(matches!(err, ReconcileError::AmbiguousFormerName { .. }));
    assert!(r.connection().executed().is_empty());
}

#[tokio::test]
async fn dry_run_renders_without_executing() {
    let r = reconciler(FakeDatabase::new("mysql", "SHOP"))
        .options(ReconcileOptions::new().with_dry_run(true));
    let definition = parse_definition("orders", MYSQL_SCRIPT).unwrap();

    let report = r.reconcile(&definition).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.statements.len(), 1);
    assert!(report.statements[0].starts_with("CREATE TABLE `ORDERS`"));
    assert!(r.connection().executed().is_empty());
}
