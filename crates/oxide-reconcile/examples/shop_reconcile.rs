//! Example: Evolving a shop schema by reconciliation
//!
//! Three revisions of an `orders` table are reconciled in turn against an
//! in-memory SQLite database. Each step prints the plan and the SQL it ran.
//!
//! Run with: cargo run --example shop_reconcile -p oxide-reconcile

use oxide_reconcile::prelude::*;

// =============================================================================
// Definitions
// =============================================================================

const V1: &str = "
id int
customer str(80) not null
amount float
primary key(id)
";

/// Adds an indexed creation date and a free-text note.
const V2: &str = "
id int
customer str(80) not null index
amount float
created date index
note str
primary key(id)
";

/// Renames the table and a column, drops the note.
const V3: &str = "
id int
client str(80) not null index former customer
amount float
created date index
primary key(id)
";

async fn step(
    reconciler: &Reconciler<SqliteConnection>,
    title: &str,
    definition: &TableDefinition,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{title}");
    println!("{}", "-".repeat(70));
    let report = reconciler.reconcile(definition).await?;
    if report.is_noop() {
        println!("    (up to date)");
    }
    for step in report.plan.steps() {
        println!("    {step}");
    }
    println!();
    for sql in &report.statements {
        println!("    {sql};");
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!(" OXIDE-RECONCILE: Shop Example");
    println!("{}", "=".repeat(70));
    println!();

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    let reconciler = Reconciler::new(SqliteConnection::new(pool))?;

    let v1 = parse_definition("orders", V1)?;
    let v2 = parse_definition("orders", V2)?;
    let v3 = parse_definition("purchases", V3)?.with_former_names(["orders"])?;

    step(&reconciler, "[1] Initial table", &v1).await?;
    step(&reconciler, "[2] Add columns and indexes", &v2).await?;
    step(&reconciler, "[3] Rename table and column", &v3).await?;
    step(&reconciler, "[4] Run again", &v3).await?;

    println!("[5] Live structure");
    println!("{}", "-".repeat(70));
    let live = reconciler
        .inspect(&QualifiedName::new(None, "PURCHASES"))
        .await?;
    println!("{}", serde_json::to_string_pretty(&live)?);

    Ok(())
}
