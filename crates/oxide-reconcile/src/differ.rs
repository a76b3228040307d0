//! Compares a desired table definition with the live table.
//!
//! The differ is pure: it looks only at the two descriptions and the
//! dialect's length rules, and produces an ordered [`MigrationPlan`].

use std::collections::BTreeSet;

use tracing::warn;

use crate::dialect::Dialect;
use crate::error::{ReconcileError, Result};
use crate::plan::{MigrationPlan, MigrationStep};
use crate::schema::{LiveColumnInfo, LiveTableInfo, TableDefinition};
use crate::types::{ColumnDefinition, columns_equal};

/// Computes migration plans for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDiffer<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> SchemaDiffer<'a> {
    /// Creates a differ for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the steps that turn `live` into `desired`.
    ///
    /// Without a live table the plan is a single [`MigrationStep::CreateTable`].
    /// A live table under another name is renamed first.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::AmbiguousFormerName`] when a column exists
    /// under both its current and a former name.
    pub fn diff(
        &self,
        desired: &TableDefinition,
        live: Option<&LiveTableInfo>,
    ) -> Result<MigrationPlan> {
        let table = desired.name().clone();
        let Some(live) = live else {
            return Ok(MigrationPlan::new(
                table,
                vec![MigrationStep::CreateTable(desired.clone())],
            ));
        };

        let mut steps = Vec::new();
        if live.name != table {
            steps.push(MigrationStep::RenameTable {
                from: live.name.clone(),
                to: table.clone(),
            });
        }

        let mut current = live.clone();
        Self::rename_columns(desired, &mut current, &mut steps)?;
        Self::diff_primary_key(desired, &current, &mut steps);
        self.diff_columns(desired, &current, &mut steps);

        Ok(MigrationPlan::new(table, steps))
    }

    /// Emits column renames and applies them to `current`, so later
    /// comparisons see the new names.
    fn rename_columns(
        desired: &TableDefinition,
        current: &mut LiveTableInfo,
        steps: &mut Vec<MigrationStep>,
    ) -> Result<()> {
        for column in desired.columns() {
            let former = column
                .former_names
                .iter()
                .find(|f| current.column(f).is_some())
                .cloned();
            let Some(former) = former else {
                continue;
            };
            if current.column(&column.name).is_some() {
                return Err(ReconcileError::AmbiguousFormerName {
                    target: format!("{}.{}", desired.name(), column.name),
                    name: former,
                    reason: "both the former and the current column exist".to_string(),
                });
            }

            for live in &mut current.columns {
                if live.name == former {
                    live.name.clone_from(&column.name);
                }
            }
            for key in &mut current.primary_key {
                if *key == former {
                    key.clone_from(&column.name);
                }
            }
            steps.push(MigrationStep::RenameColumn {
                from: former,
                to: column.name.clone(),
            });
        }
        Ok(())
    }

    fn diff_primary_key(
        desired: &TableDefinition,
        current: &LiveTableInfo,
        steps: &mut Vec<MigrationStep>,
    ) {
        let wanted: BTreeSet<&str> = desired.primary_key().iter().map(String::as_str).collect();
        let present: BTreeSet<&str> = current.primary_key.iter().map(String::as_str).collect();
        if wanted == present {
            return;
        }
        if current.has_primary_key() {
            steps.push(MigrationStep::DropPrimaryKey {
                constraint: current.primary_key_name.clone(),
            });
        }
        if !desired.primary_key().is_empty() {
            steps.push(MigrationStep::AddPrimaryKey {
                columns: desired.primary_key().to_vec(),
            });
        }
    }

    fn diff_columns(
        &self,
        desired: &TableDefinition,
        current: &LiveTableInfo,
        steps: &mut Vec<MigrationStep>,
    ) {
        let table = desired.name();

        for live in &current.columns {
            let wanted = desired.column(&live.name);
            if let Some(index_name) = &live.index_name {
                if !wanted.is_some_and(|c| c.wants_index) {
                    steps.push(MigrationStep::DropIndex {
                        index_name: index_name.clone(),
                        table: table.clone(),
                    });
                }
            }
            if wanted.is_none() {
                warn!(table = %table, column = %live.name, "Dropping column not in definition");
                steps.push(MigrationStep::DropColumn {
                    name: live.name.clone(),
                });
            }
        }

        for column in desired.columns() {
            let Some(live) = current.column(&column.name) else {
                steps.push(MigrationStep::AddColumn {
                    column: column.clone(),
                });
                if column.wants_index {
                    steps.push(MigrationStep::AddIndex {
                        column: column.name.clone(),
                    });
                }
                continue;
            };
            if !self.matches(column, live) {
                steps.push(MigrationStep::AlterColumnType {
                    name: column.name.clone(),
                    column: column.clone(),
                    current: live.clone(),
                });
            }
            if column.wants_index && live.index_name.is_none() {
                steps.push(MigrationStep::AddIndex {
                    column: column.name.clone(),
                });
            }
        }
    }

    /// True when the live column already has the desired shape, judged by
    /// the length the dialect would actually give the desired column.
    fn matches(&self, column: &ColumnDefinition, live: &LiveColumnInfo) -> bool {
        let Some(have) = live.to_definition(self.dialect.kind()) else {
            return false;
        };
        let mut want = column.clone();
        want.max_length = self
            .dialect
            .effective_length(column.logical_type, column.max_length);
        columns_equal(&want, &have)
    }
}
