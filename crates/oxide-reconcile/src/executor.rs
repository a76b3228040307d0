//! Plan executor.
//!
//! This module renders a [`MigrationPlan`] to DDL and runs it against a
//! [`Connection`].

use tracing::{debug, info};

use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::error::{ReconcileError, Result};
use crate::plan::{MigrationPlan, MigrationStep};

/// Executes migration plans one statement at a time.
///
/// Statements run sequentially without a surrounding transaction; many
/// databases commit DDL implicitly. The first failure stops execution and
/// earlier statements stay applied.
pub struct PlanExecutor<'a> {
    conn: &'a dyn Connection,
    dialect: &'a dyn Dialect,
    dry_run: bool,
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new executor.
    #[must_use]
    pub const fn new(conn: &'a dyn Connection, dialect: &'a dyn Dialect) -> Self {
        Self {
            conn,
            dialect,
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is rendered and logged but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Renders every step of the plan, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnsupportedOperation`] if any step has no
    /// DDL in this dialect.
    pub fn render(&self, plan: &MigrationPlan) -> Result<Vec<String>> {
        Ok(self
            .render_steps(plan)?
            .into_iter()
            .flat_map(|(_, sql)| sql)
            .collect())
    }

    fn render_steps<'p>(
        &self,
        plan: &'p MigrationPlan,
    ) -> Result<Vec<(&'p MigrationStep, Vec<String>)>> {
        plan.steps()
            .iter()
            .map(|step| {
                self.dialect
                    .generate_sql(&plan.table, step)
                    .map(|sql| (step, sql))
            })
            .collect()
    }

    /// Renders the whole plan, then executes it. Nothing runs if rendering
    /// fails.
    ///
    /// Returns the statements executed, or in dry-run mode the statements
    /// that would have been.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnsupportedOperation`] from rendering, or
    /// [`ReconcileError::Execution`] naming the first failing statement.
    pub async fn apply(&self, plan: &MigrationPlan) -> Result<Vec<String>> {
        let rendered = self.render_steps(plan)?;
        if plan.is_empty() {
            debug!(table = %plan.table, "Table is up to date");
            return Ok(Vec::new());
        }

        info!(
            table = %plan.table,
            steps = plan.len(),
            dry_run = self.dry_run,
            "Applying plan"
        );
        let mut statements = Vec::new();
        for (step, sqls) in rendered {
            info!(table = %plan.table, step = %step, "Applying step");
            for sql in sqls {
                if self.dry_run {
                    info!(sql = %sql, "Would execute");
                } else {
                    debug!(sql = %sql, "Executing SQL");
                    if let Err(source) = self.conn.execute(&sql).await {
                        return Err(ReconcileError::Execution {
                            statement: sql,
                            source,
                        });
                    }
                }
                statements.push(sql);
            }
        }

        if !self.dry_run {
            info!(table = %plan.table, statements = statements.len(), "Plan applied successfully");
        }
        Ok(statements)
    }
}
