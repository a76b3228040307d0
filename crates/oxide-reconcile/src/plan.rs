//! Migration steps and ordered plans.
//!
//! A [`MigrationPlan`] is the output of the differ: the steps that turn one
//! live table into the desired definition, kept in a fixed order so that
//! renames happen before anything refers to the new names and keys are
//! dropped before the columns they cover.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{LiveColumnInfo, QualifiedName, TableDefinition};
use crate::types::ColumnDefinition;

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationStep {
    /// Rename the table.
    RenameTable {
        /// Current name, schema filled in.
        from: QualifiedName,
        /// Desired name.
        to: QualifiedName,
    },
    /// Rename a column.
    RenameColumn {
        /// Current column name.
        from: String,
        /// Desired column name.
        to: String,
    },
    /// Drop the primary key.
    DropPrimaryKey {
        /// Constraint name, when the catalog reported one.
        constraint: Option<String>,
    },
    /// Drop a single-column index.
    DropIndex {
        /// Index name, possibly `OWNER.NAME`.
        index_name: String,
        /// Table the index belongs to.
        table: QualifiedName,
    },
    /// Drop a column.
    DropColumn {
        /// Column name.
        name: String,
    },
    /// Add a column.
    AddColumn {
        /// Column to add.
        column: ColumnDefinition,
    },
    /// Change a column's type, length or nullability.
    AlterColumnType {
        /// Column name.
        name: String,
        /// Desired definition.
        column: ColumnDefinition,
        /// The column as it is now.
        current: LiveColumnInfo,
    },
    /// Create a single-column index.
    AddIndex {
        /// Column to index.
        column: String,
    },
    /// Create the primary key.
    AddPrimaryKey {
        /// Key columns in key order.
        columns: Vec<String>,
    },
    /// Create the whole table with its key and indexes.
    CreateTable(TableDefinition),
}

impl MigrationStep {
    /// Position of this kind of step within a plan.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::RenameTable { .. } => 0,
            Self::RenameColumn { .. } => 1,
            Self::DropPrimaryKey { .. } => 2,
            Self::DropIndex { .. } => 3,
            Self::DropColumn { .. } => 4,
            Self::AddColumn { .. } => 5,
            Self::AlterColumnType { .. } => 6,
            Self::AddIndex { .. } => 7,
            Self::AddPrimaryKey { .. } => 8,
            Self::CreateTable(_) => 9,
        }
    }

    /// Short label such as `AlterColumnType(NOTE)`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::RenameTable { from, .. } => format!("RenameTable({from})"),
            Self::RenameColumn { from, .. } => format!("RenameColumn({from})"),
            Self::DropPrimaryKey { .. } => "DropPrimaryKey".to_string(),
            Self::DropIndex { index_name, .. } => format!("DropIndex({index_name})"),
            Self::DropColumn { name } => format!("DropColumn({name})"),
            Self::AddColumn { column } => format!("AddColumn({})", column.name),
            Self::AlterColumnType { name, .. } => format!("AlterColumnType({name})"),
            Self::AddIndex { column } => format!("AddIndex({column})"),
            Self::AddPrimaryKey { columns } => format!("AddPrimaryKey({})", columns.join(",")),
            Self::CreateTable(def) => format!("CreateTable({})", def.name()),
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenameTable { from, to } => write!(f, "Rename table '{from}' to '{to}'"),
            Self::RenameColumn { from, to } => write!(f, "Rename column '{from}' to '{to}'"),
            Self::DropPrimaryKey { .. } => f.write_str("Drop primary key"),
            Self::DropIndex { index_name, .. } => write!(f, "Drop index '{index_name}'"),
            Self::DropColumn { name } => write!(f, "Drop column '{name}'"),
            Self::AddColumn { column } => write!(f, "Add column '{}'", column.name),
            Self::AlterColumnType { name, .. } => write!(f, "Alter column '{name}'"),
            Self::AddIndex { column } => write!(f, "Add index on '{column}'"),
            Self::AddPrimaryKey { columns } => {
                write!(f, "Add primary key ({})", columns.join(", "))
            }
            Self::CreateTable(def) => write!(f, "Create table '{}'", def.name()),
        }
    }
}

/// Ordered steps for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// The desired table name.
    pub table: QualifiedName,
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    /// Creates a plan, sorting the steps into execution order. Steps of the
    /// same kind keep their relative order.
    #[must_use]
    pub fn new(table: QualifiedName, mut steps: Vec<MigrationStep>) -> Self {
        steps.sort_by_key(MigrationStep::rank);
        Self { table, steps }
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Returns true if the table already matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step labels in order, e.g. `["RenameTable(A)", "AddColumn(B)"]`.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.steps.iter().map(MigrationStep::label).collect()
    }
}
