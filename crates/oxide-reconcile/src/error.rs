//! Error types for schema reconciliation.

use crate::types::LogicalType;

/// Error reported by a database driver behind the [`Connection`] capability.
///
/// [`Connection`]: crate::connection::Connection
pub type DbError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reconciling a table.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The table definition is malformed (unknown primary-key column,
    /// duplicate column names, invalid identifiers).
    #[error("Invalid definition for '{table}': {message}")]
    Definition {
        /// Table the definition describes.
        table: String,
        /// What is wrong with it.
        message: String,
    },

    /// Former names are duplicated, or both a former and the current name
    /// exist at once.
    #[error("Ambiguous former name '{name}' for '{target}': {reason}")]
    AmbiguousFormerName {
        /// The table or column being resolved.
        target: String,
        /// The offending former name.
        name: String,
        /// Why the name is ambiguous.
        reason: String,
    },

    /// The dialect identifier is not one of the supported backends.
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// The logical type tag is not one of the five logical types.
    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),

    /// The dialect has no DDL for this kind of step.
    #[error("{dialect} cannot {operation} on table {table}")]
    UnsupportedOperation {
        /// Dialect name.
        dialect: &'static str,
        /// The step that cannot be expressed.
        operation: String,
        /// Table the step applies to.
        table: String,
    },

    /// A catalog query failed or returned rows of an unexpected shape.
    #[error("Failed to introspect '{table}' with `{statement}`: {source}")]
    Introspection {
        /// Table being introspected.
        table: String,
        /// The failing catalog statement.
        statement: String,
        /// Underlying cause.
        #[source]
        source: DbError,
    },

    /// A value could not be converted to or from its canonical form.
    #[error("Column {column} expects {expected} but received {received}")]
    TypeCoercion {
        /// Column name.
        column: String,
        /// Logical type of the column.
        expected: LogicalType,
        /// Observed kind of the offending value.
        received: String,
    },

    /// A generated DDL statement failed. Earlier statements stay applied.
    #[error("Failed to execute `{statement}`: {source}")]
    Execution {
        /// The failing statement.
        statement: String,
        /// Underlying cause.
        #[source]
        source: DbError,
    },

    /// A definition script line could not be parsed.
    #[error("Line {line}: {content}: {message}")]
    Script {
        /// 1-based line number.
        line: usize,
        /// The offending line, trimmed.
        content: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ReconcileError {
    /// Creates a definition error.
    #[must_use]
    pub fn definition(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an introspection error wrapping a driver failure.
    #[must_use]
    pub fn introspection(
        table: impl Into<String>,
        statement: impl Into<String>,
        source: impl Into<DbError>,
    ) -> Self {
        Self::Introspection {
            table: table.into(),
            statement: statement.into(),
            source: source.into(),
        }
    }

    /// Creates a coercion error.
    #[must_use]
    pub fn coercion(
        column: impl Into<String>,
        expected: LogicalType,
        received: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            column: column.into(),
            expected,
            received: received.into(),
        }
    }

    /// Returns the SQL statement attached to this error, if any.
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Introspection { statement, .. } | Self::Execution { statement, .. } => {
                Some(statement)
            }
            _ => None,
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
