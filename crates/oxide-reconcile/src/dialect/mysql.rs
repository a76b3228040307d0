//! MySQL and MariaDB dialect.

use crate::error::Result;
use crate::schema::{LiveColumnInfo, ObservedType, QualifiedName};
use crate::types::{ColumnDefinition, LogicalType};

use super::{CatalogColumn, Dialect, DialectKind, clamp_length, sql_literal};

const TEXT_TYPES: [&str; 4] = ["text", "tinytext", "mediumtext", "longtext"];

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn physical_type(&self, logical_type: LogicalType, max_length: i32) -> String {
        match logical_type {
            LogicalType::String if max_length > 0 => format!("VARCHAR({max_length})"),
            LogicalType::String => "TEXT".to_string(),
            LogicalType::Integer => "BIGINT".to_string(),
            LogicalType::Float => "DOUBLE PRECISION".to_string(),
            LogicalType::DateTime => "DATETIME".to_string(),
            LogicalType::Binary => "BLOB".to_string(),
        }
    }

    fn classify(&self, column: &CatalogColumn) -> ObservedType {
        let data_type = column.data_type.to_lowercase();
        match data_type.as_str() {
            "varchar" | "char" => ObservedType::Known(LogicalType::String),
            t if TEXT_TYPES.contains(&t) => ObservedType::Known(LogicalType::String),
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
                ObservedType::Known(LogicalType::Integer)
            }
            "double" | "float" | "real" | "decimal" => ObservedType::Known(LogicalType::Float),
            "datetime" | "timestamp" | "date" => ObservedType::Known(LogicalType::DateTime),
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
                ObservedType::Known(LogicalType::Binary)
            }
            _ => ObservedType::Opaque(column.raw_type.clone()),
        }
    }

    fn observed_length(&self, column: &CatalogColumn) -> i32 {
        // TEXT columns report their storage ceiling as a length.
        if TEXT_TYPES.contains(&column.data_type.to_lowercase().as_str()) {
            return 0;
        }
        column.max_length.map_or(0, clamp_length)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", self.fold_case(name))
    }

    fn current_schema_sql(&self) -> Option<&'static str> {
        Some("SELECT upper(schema())")
    }

    fn table_exists_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT count(*) AS CNT FROM information_schema.tables \
             WHERE upper(table_schema) = {} AND upper(table_name) = {}",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn columns_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(column_name) AS NAME, data_type AS DATA_TYPE, \
             CASE WHEN is_nullable = 'YES' THEN 1 ELSE 0 END AS NULLABLE, \
             character_maximum_length AS MAX_LENGTH, column_type AS RAW_TYPE, \
             numeric_precision AS DATA_PRECISION, numeric_scale AS DATA_SCALE \
             FROM information_schema.columns \
             WHERE upper(table_schema) = {} AND upper(table_name) = {} \
             ORDER BY ordinal_position",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn primary_key_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(column_name) AS NAME, index_name AS CONSTRAINT_NAME \
             FROM information_schema.statistics \
             WHERE upper(table_schema) = {} AND upper(table_name) = {} \
             AND index_name = 'PRIMARY' \
             ORDER BY seq_in_index",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn indexes_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT upper(min(index_schema)) AS INDEX_OWNER, upper(index_name) AS INDEX_NAME, \
             upper(min(column_name)) AS COLUMN_NAME \
             FROM information_schema.statistics \
             WHERE upper(table_schema) = {} AND upper(table_name) = {} \
             AND index_name <> 'PRIMARY' AND non_unique = 1 \
             GROUP BY index_name HAVING count(*) = 1 \
             ORDER BY index_name",
            sql_literal(schema),
            sql_literal(table)
        )
    }

    fn rename_table_sql(&self, from: &QualifiedName, to: &QualifiedName) -> String {
        let target = QualifiedName {
            schema: from.schema.clone(),
            table: to.table.clone(),
        };
        format!(
            "RENAME TABLE {} TO {}",
            self.quote_table(from),
            self.quote_table(&target)
        )
    }

    fn alter_column_sql(
        &self,
        table: &QualifiedName,
        column: &ColumnDefinition,
        _current: &LiveColumnInfo,
    ) -> Result<Vec<String>> {
        let null = if column.nullable { "NULL" } else { "NOT NULL" };
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {} {} {null}",
            self.quote_table(table),
            self.quote_identifier(&column.name),
            self.column_type(column)
        )])
    }

    fn drop_index_sql(&self, table: &QualifiedName, index_name: &str) -> String {
        // The owner prefix is the schema; MySQL scopes index names per table.
        let name = index_name.rsplit('.').next().unwrap_or(index_name);
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(name),
            self.quote_table(table)
        )
    }

    fn drop_primary_key_sql(
        &self,
        table: &QualifiedName,
        _constraint: Option<&str>,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.quote_table(table)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::MigrationStep;

    fn orders() -> QualifiedName {
        QualifiedName::new(Some("SHOP"), "ORDERS")
    }

    fn catalog(data_type: &str, max_length: Option<i64>) -> CatalogColumn {
        CatalogColumn {
            name: "C".into(),
            data_type: data_type.into(),
            nullable: true,
            max_length,
            raw_type: data_type.into(),
            precision: None,
            scale: None,
        }
    }

    #[test]
    fn test_backtick_quoting() {
        assert_eq!(MySqlDialect::new().quote_table(&orders()), "`SHOP`.`ORDERS`");
    }

    #[test]
    fn test_rename_table_statement() {
        let d = MySqlDialect::new();
        let step = MigrationStep::RenameTable {
            from: QualifiedName::new(Some("SHOP"), "ORDERS_OLD"),
            to: QualifiedName::new(None, "ORDERS"),
        };
        assert_eq!(
            d.generate_sql(&orders(), &step).unwrap(),
            vec!["RENAME TABLE `SHOP`.`ORDERS_OLD` TO `SHOP`.`ORDERS`"]
        );
    }

    #[test]
    fn test_int_family_is_integer() {
        let d = MySqlDialect::new();
        for t in ["int", "bigint", "smallint", "tinyint"] {
            assert_eq!(
                d.classify(&catalog(t, None)),
                ObservedType::Known(LogicalType::Integer),
                "{t}"
            );
        }
    }

    #[test]
    fn test_text_reports_unbounded_length() {
        let d = MySqlDialect::new();
        let text = catalog("text", Some(65535));
        assert_eq!(d.classify(&text), ObservedType::Known(LogicalType::String));
        assert_eq!(d.observed_length(&text), 0);
        assert_eq!(d.observed_length(&catalog("varchar", Some(20))), 20);
    }

    #[test]
    fn test_modify_column_states_nullability() {
        let d = MySqlDialect::new();
        let current = LiveColumnInfo {
            name: "QTY".into(),
            observed_type: ObservedType::Known(LogicalType::Integer),
            max_length: 0,
            nullable: true,
            raw_type: "int".into(),
            index_name: None,
        };
        let col = ColumnDefinition::new("QTY", LogicalType::Integer);
        assert_eq!(
            d.alter_column_sql(&orders(), &col, &current).unwrap(),
            vec!["ALTER TABLE `SHOP`.`ORDERS` MODIFY COLUMN `QTY` BIGINT NULL"]
        );
    }

    #[test]
    fn test_index_statements() {
        let d = MySqlDialect::new();
        assert_eq!(
            d.drop_index_sql(&orders(), "SHOP.IDX_ORDERS_NOTE"),
            "DROP INDEX `IDX_ORDERS_NOTE` ON `SHOP`.`ORDERS`"
        );
        assert_eq!(
            d.drop_primary_key_sql(&orders(), Some("PRIMARY")).unwrap(),
            "ALTER TABLE `SHOP`.`ORDERS` DROP PRIMARY KEY"
        );
    }
}
