//! The reconcile pipeline: resolve, introspect, diff, execute.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::connection::Connection;
use crate::dialect::{Dialect, dialect_for};
use crate::differ::SchemaDiffer;
use crate::error::Result;
use crate::executor::PlanExecutor;
use crate::introspect::Introspector;
use crate::plan::MigrationPlan;
use crate::resolver::resolve_source;
use crate::schema::{LiveTableInfo, QualifiedName, TableDefinition};

/// Options for a [`Reconciler`].
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Render and log statements without executing them.
    pub dry_run: bool,
}

impl ReconcileOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Outcome of one reconcile call.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// The plan that was computed.
    pub plan: MigrationPlan,
    /// Statements executed, or that would run in dry-run mode.
    pub statements: Vec<String>,
    /// Whether execution was skipped.
    pub dry_run: bool,
}

impl ReconcileReport {
    /// Returns true if the table already matched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.plan.is_empty()
    }
}

/// Brings tables in line with their definitions.
///
/// A reconciler owns its connection and holds no other state between
/// calls. Reconciling the same table from two places at once is not
/// coordinated; callers must serialize that themselves.
pub struct Reconciler<C> {
    conn: C,
    dialect: Arc<dyn Dialect>,
    options: ReconcileOptions,
}

impl<C: Connection> Reconciler<C> {
    /// Creates a reconciler, picking the dialect from the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnsupportedDialect`] if the connection's
    /// dialect is unknown.
    ///
    /// [`ReconcileError::UnsupportedDialect`]: crate::ReconcileError::UnsupportedDialect
    pub fn new(conn: C) -> Result<Self> {
        let dialect = dialect_for(conn.dialect_name())?;
        Ok(Self::with_dialect(conn, dialect))
    }

    /// Creates a reconciler with an explicit dialect.
    #[must_use]
    pub fn with_dialect(conn: C, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            conn,
            dialect,
            options: ReconcileOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// The connection.
    #[must_use]
    pub const fn connection(&self) -> &C {
        &self.conn
    }

    /// The dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn introspector(&self) -> Introspector<'_> {
        Introspector::new(&self.conn, self.dialect.as_ref())
    }

    /// Reads the live structure of a table.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Introspection`] if a catalog query fails.
    ///
    /// [`ReconcileError::Introspection`]: crate::ReconcileError::Introspection
    pub async fn inspect(&self, table: &QualifiedName) -> Result<Option<LiveTableInfo>> {
        self.introspector().fetch(table).await
    }

    /// Computes the plan for a definition without touching the database
    /// beyond catalog reads.
    ///
    /// # Errors
    ///
    /// Fails on ambiguous former names or catalog errors.
    pub async fn plan(&self, definition: &TableDefinition) -> Result<MigrationPlan> {
        let introspector = self.introspector();
        let resolution = resolve_source(&introspector, definition).await?;
        let live = match resolution.source() {
            Some(source) => introspector.fetch(source).await?,
            None => None,
        };
        SchemaDiffer::new(self.dialect.as_ref()).diff(definition, live.as_ref())
    }

    /// Computes and executes the plan for a definition.
    ///
    /// # Errors
    ///
    /// Fails on ambiguous former names, catalog errors, steps the dialect
    /// cannot express (before anything runs) and the first failing
    /// statement.
    pub async fn reconcile(&self, definition: &TableDefinition) -> Result<ReconcileReport> {
        let plan = self.plan(definition).await?;
        info!(
            table = %plan.table,
            dialect = self.dialect.name(),
            steps = ?plan.labels(),
            "Computed plan"
        );
        let statements = PlanExecutor::new(&self.conn, self.dialect.as_ref())
            .dry_run(self.options.dry_run)
            .apply(&plan)
            .await?;
        Ok(ReconcileReport {
            plan,
            statements,
            dry_run: self.options.dry_run,
        })
    }
}
