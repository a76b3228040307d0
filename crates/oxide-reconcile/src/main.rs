//! oxide-reconcile CLI
//!
//! Command-line tool for reconciling tables against their definitions.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_reconcile::prelude::*;

/// Declarative table reconciliation.
#[derive(Parser)]
#[command(name = "oxide-reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DefinitionArgs {
    /// Definition file: a table script, or JSON if it ends in `.json`.
    definition: PathBuf,

    /// Table name, optionally `schema.table`.
    #[arg(short, long)]
    table: String,

    /// Former table name; repeat for several, most recent first.
    #[arg(short, long = "former")]
    former: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the plan and its SQL without executing.
    Plan {
        #[command(flatten)]
        args: DefinitionArgs,
    },

    /// Bring the table in line with its definition.
    Apply {
        #[command(flatten)]
        args: DefinitionArgs,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the live structure of a table as JSON.
    Inspect {
        /// Table name, optionally `schema.table`.
        table: String,
    },
}

fn load_definition(args: &DefinitionArgs) -> anyhow::Result<TableDefinition> {
    let source = std::fs::read_to_string(&args.definition)
        .with_context(|| format!("cannot read {}", args.definition.display()))?;
    let mut former = args.former.clone();
    let definition = if is_json(&args.definition) {
        let parsed: TableDefinition = serde_json::from_str(&source)
            .with_context(|| format!("invalid definition in {}", args.definition.display()))?;
        // The file names a table too; the command line wins.
        former.extend(parsed.former_names().iter().map(ToString::to_string));
        TableDefinition::new(
            &args.table,
            parsed.columns().to_vec(),
            parsed.primary_key().to_vec(),
        )?
    } else {
        parse_definition(&args.table, &source)?
    };
    Ok(definition.with_former_names(former)?)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let conn = SqliteConnection::connect(&cli.database)
        .await
        .map_err(|e| anyhow::anyhow!("cannot open {}: {e}", cli.database))?;
    let reconciler = Reconciler::new(conn)?;

    match cli.command {
        Commands::Plan { args } => {
            let definition = load_definition(&args)?;
            let plan = reconciler.plan(&definition).await?;
            if plan.is_empty() {
                info!(table = %plan.table, "Table is up to date");
                return Ok(());
            }

            let statements = PlanExecutor::new(reconciler.connection(), reconciler.dialect())
                .render(&plan)?;
            println!("\nPlan for {}:", plan.table);
            println!("{:-<60}", "");
            for label in plan.labels() {
                println!("  {label}");
            }
            println!("\nSQL:");
            for sql in &statements {
                println!("{sql};");
            }
            println!();
        }

        Commands::Apply { args, dry_run } => {
            let definition = load_definition(&args)?;
            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            let reconciler = reconciler.options(ReconcileOptions::new().with_dry_run(dry_run));
            let report = reconciler.reconcile(&definition).await?;
            if report.is_noop() {
                info!(table = %report.plan.table, "Nothing to do");
            } else if dry_run {
                for sql in &report.statements {
                    println!("{sql};");
                }
            } else {
                info!(
                    table = %report.plan.table,
                    statements = report.statements.len(),
                    "Table reconciled"
                );
            }
        }

        Commands::Inspect { table } => {
            let name = QualifiedName::parse(&table)?;
            match reconciler.inspect(&name).await? {
                Some(live) => println!("{}", serde_json::to_string_pretty(&live)?),
                None => anyhow::bail!("table {name} does not exist"),
            }
        }
    }

    Ok(())
}
