//! Line-oriented table definition scripts.
//!
//! Each non-blank line is either a primary key declaration or a column:
//!
//! ```text
//! id      str(40)
//! code
//! amount  float not null
//! created date index
//! note    str(200) null former remark,comment
//! primary key(id,code)
//! ```
//!
//! `code` has no type, so it is a `str(40)` like `id`.
//!
//! Types are `str`, `str(N)`, `int`, `date`, `float` and `bytea`, in any
//! case. A line without a type copies the previous column, applying any
//! nullability or index modifiers it does give. Former names are never
//! copied.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{ReconcileError, Result};
use crate::schema::TableDefinition;
use crate::types::{ColumnDefinition, LogicalType};

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^([\p{L}\p{N}_$#]+)(?:\s+(bytea|date|float|int|str\s*\(\s*(\d+)\s*\)|str))?(?:\s+(not\s+null|null))?(?:\s+(index))?(?:\s+former\s+([\p{L}\p{N}_$#]+(?:\s*,\s*[\p{L}\p{N}_$#]+)*))?$",
        )
        .expect("column pattern is valid")
    })
}

fn primary_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^primary\s+key\s*\((.*)\)$").expect("primary key pattern is valid")
    })
}

struct ScriptLine<'a> {
    line: usize,
    content: &'a str,
}

impl ScriptLine<'_> {
    fn error(&self, message: impl Into<String>) -> ReconcileError {
        ReconcileError::Script {
            line: self.line,
            content: self.content.to_string(),
            message: message.into(),
        }
    }
}

/// Parses a definition script into a validated [`TableDefinition`].
///
/// # Errors
///
/// Returns [`ReconcileError::Script`] naming the 1-based line for lines
/// that do not parse, and the errors of [`TableDefinition::new`] for
/// definitions that parse but are invalid.
pub fn parse_definition(name: &str, source: &str) -> Result<TableDefinition> {
    let mut columns: Vec<ColumnDefinition> = Vec::new();
    let mut primary_key = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let content = raw.trim();
        if content.is_empty() {
            continue;
        }
        let at = ScriptLine {
            line: idx + 1,
            content,
        };

        if let Some(caps) = primary_key_pattern().captures(content) {
            let list = caps.get(1).map_or("", |m| m.as_str().trim());
            for key in list.split(',').map(str::trim) {
                if key.is_empty() {
                    return Err(at.error("empty column in primary key"));
                }
                primary_key.push(key.to_string());
            }
            continue;
        }

        let Some(caps) = column_pattern().captures(content) else {
            return Err(at.error("expected '<name> [type] [null|not null] [index]'"));
        };
        let column = parse_column(&caps, columns.last(), &at)?;
        columns.push(column);
    }

    TableDefinition::new(name, columns, primary_key)
}

fn parse_column(
    caps: &Captures<'_>,
    previous: Option<&ColumnDefinition>,
    at: &ScriptLine<'_>,
) -> Result<ColumnDefinition> {
    let name = &caps[1];
    let mut column = match caps.get(2) {
        Some(ty) => {
            let ty = ty.as_str().to_lowercase();
            if let Some(len) = caps.get(3) {
                let len: i32 = len
                    .as_str()
                    .parse()
                    .map_err(|_| at.error(format!("length '{}' is too large", len.as_str())))?;
                ColumnDefinition::string(name, len)
            } else {
                let logical = match ty.as_str() {
                    "bytea" => LogicalType::Binary,
                    "date" => LogicalType::DateTime,
                    "float" => LogicalType::Float,
                    "int" => LogicalType::Integer,
                    _ => LogicalType::String,
                };
                ColumnDefinition::new(name, logical)
            }
        }
        None => {
            let Some(previous) = previous else {
                return Err(at.error("the first column needs a data type"));
            };
            let mut column = previous.clone();
            column.name = name.trim().to_uppercase();
            column.former_names.clear();
            column.fetched = None;
            column
        }
    };

    if let Some(null) = caps.get(4) {
        column.nullable = !null.as_str().to_lowercase().starts_with("not");
    }
    if caps.get(5).is_some() {
        column.wants_index = true;
    }
    if let Some(former) = caps.get(6) {
        for name in former.as_str().split(',') {
            column = column.former_name(name);
        }
    }
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_types_and_modifiers() {
        let def = parse_definition(
            "orders",
            "id str(40)\n\
             qty INT not null\n\
             price float\n\
             created date index\n\
             blob bytea null\n\
             note str\n\
             primary key(id)\n",
        )
        .unwrap();

        assert_eq!(def.name().table, "ORDERS");
        assert_eq!(def.primary_key(), ["ID"]);
        let id = def.column("ID").unwrap();
        assert_eq!((id.logical_type, id.max_length, id.nullable), (LogicalType::String, 40, false));
        let qty = def.column("QTY").unwrap();
        assert_eq!(qty.logical_type, LogicalType::Integer);
        assert!(!qty.nullable);
        assert_eq!(def.column("PRICE").unwrap().logical_type, LogicalType::Float);
        let created = def.column("CREATED").unwrap();
        assert_eq!(created.logical_type, LogicalType::DateTime);
        assert!(created.wants_index);
        assert_eq!(def.column("BLOB").unwrap().logical_type, LogicalType::Binary);
        let note = def.column("NOTE").unwrap();
        assert!(note.is_unbounded());
        assert!(note.nullable);
    }

    #[test]
    fn test_omitted_type_copies_previous_column() {
        let def = parse_definition(
            "t",
            "a str(10) not null index former old_a\nb\nc null\n",
        )
        .unwrap();
        let b = def.column("B").unwrap();
        assert_eq!(b.max_length, 10);
        assert!(!b.nullable);
        assert!(b.wants_index);
        assert!(b.former_names.is_empty());
        assert_eq!(def.column("A").unwrap().former_names, ["OLD_A"]);

        let c = def.column("C").unwrap();
        assert_eq!(c.max_length, 10);
        assert!(c.nullable);
    }

    #[test]
    fn test_composite_key_and_blank_lines() {
        let def = parse_definition(
            "t",
            "\r\n  a int\n\n  b str(5)  \nPrimary Key( a , b )\n",
        )
        .unwrap();
        assert_eq!(def.primary_key(), ["A", "B"]);
        assert!(!def.column("A").unwrap().nullable);
    }

    #[test]
    fn test_unbounded_string_key_gets_default_length() {
        let def = parse_definition("t", "code str\nprimary key(code)").unwrap();
        assert_eq!(def.column("CODE").unwrap().max_length, 300);
    }

    #[test]
    fn test_unicode_names() {
        let def = parse_definition("t", "名称 str(20)\n编号 int").unwrap();
        assert!(def.column("名称").is_some());
        assert!(def.column("编号").is_some());
    }

    #[test]
    fn test_first_line_without_type() {
        let err = parse_definition("t", "\nid\n").unwrap_err();
        match err {
            ReconcileError::Script { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_line() {
        let err = parse_definition("t", "id int\nname varchar(20)\n").unwrap_err();
        assert!(matches!(err, ReconcileError::Script { line: 2, .. }));
        assert!(err.to_string().starts_with("Line 2: name varchar(20)"));
    }

    #[test]
    fn test_empty_key_column() {
        let err = parse_definition("t", "id int\nprimary key(id,)").unwrap_err();
        assert!(matches!(err, ReconcileError::Script { line: 2, .. }));
    }

    #[test]
    fn test_undefined_key_column_is_definition_error() {
        let err = parse_definition("t", "id int\nprimary key(code)").unwrap_err();
        assert!(matches!(err, ReconcileError::Definition { .. }));
    }
}
