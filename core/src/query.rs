//! SQL generation from record types and record state.
//!
//! Every function here is pure: it turns schema and record state into SQL
//! text plus positional parameters and never touches a database. Table and
//! column names are the lower-cased type name and the field names, always
//! double-quoted.
//!
//! # Example
//!
//! ```
//! use recordkit_core::query::create_table_statement;
//! use recordkit_core::{Field, RecordDecl, Registry};
//!
//! let registry = Registry::builder()
//!     .register(
//!         RecordDecl::new("Person")
//!             .field("name", Field::text())
//!             .field("age", Field::integer()),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let sql = create_table_statement(registry.get("Person").unwrap(), true).unwrap();
//! assert_eq!(
//!     sql,
//!     "CREATE TABLE IF NOT EXISTS \"person\" (\n  \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n  \"name\" TEXT NOT NULL,\n  \"age\" INT NOT NULL\n);"
//! );
//! ```

use crate::error::{LifecycleError, OrmError, QueryError, Result, SchemaError, ValidationError};
use crate::field::Field;
use crate::record::Record;
use crate::registry::{ID_FIELD, RecordType};
use crate::value::Value;

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Count query guarding a manually assigned auto-increment value.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCheck {
    pub statement: Statement,
    pub column: String,
    pub value: i64,
}

/// An insert plus the duplicate checks that must pass before it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub statement: Statement,
    pub duplicate_checks: Vec<DuplicateCheck>,
}

/// A select and its effective row limit.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectPlan {
    pub statement: Statement,
    pub limit: Option<u64>,
}

/// An update and the resolved values it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub statement: Statement,
    pub assignments: Vec<(String, Value)>,
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds the `CREATE TABLE` statement for a record type.
///
/// Columns follow declaration order, `id` first.
///
/// # Errors
///
/// Returns [`SchemaError::EmptyMetadata`] if a column yields no metadata.
pub fn create_table_statement(
    record_type: &RecordType,
    if_not_exists: bool,
) -> std::result::Result<String, SchemaError> {
    let mut lines = Vec::with_capacity(record_type.fields().len());
    for (column, metadata) in record_type.metadata() {
        if metadata.is_empty() {
            return Err(SchemaError::EmptyMetadata {
                table: record_type.table_name().to_string(),
                column,
            });
        }
        let parts: Vec<&str> = metadata
            .iter()
            .map(String::as_str)
            .filter(|part| !part.is_empty())
            .collect();
        lines.push(format!("  {} {}", quote_identifier(&column), parts.join(" ")));
    }

    let if_clause = if if_not_exists { "IF NOT EXISTS " } else { "" };
    Ok(format!(
        "CREATE TABLE {if_clause}{} (\n{}\n);",
        quote_identifier(record_type.table_name()),
        lines.join(",\n")
    ))
}

/// Builds the `INSERT` for a record.
///
/// An auto-increment column is skipped when it holds no value; when it does
/// hold one, a duplicate check on that column is planned.
///
/// # Errors
///
/// Fails if a reference holds a record without an id.
pub fn insert_statement(record: &Record) -> Result<InsertPlan> {
    let record_type = record.record_type();
    let table = quote_identifier(record_type.table_name());
    let mut columns = Vec::new();
    let mut params = Vec::new();
    let mut duplicate_checks = Vec::new();

    for ((name, field), (_, value)) in record_type.fields().iter().zip(record.values()) {
        if field.is_auto_increment() {
            match value.as_integer() {
                None if value.is_null() => continue,
                Some(id) => duplicate_checks.push(DuplicateCheck {
                    statement: Statement::new(
                        format!(
                            "SELECT COUNT(*) FROM {table} WHERE {} = ?",
                            quote_identifier(name)
                        ),
                        vec![Value::Integer(id)],
                    ),
                    column: name.clone(),
                    value: id,
                }),
                None => {}
            }
        }
        columns.push(quote_identifier(name));
        params.push(bind_value(field, value)?);
    }

    let placeholders = vec!["?"; params.len()].join(", ");
    let sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        )
    };

    Ok(InsertPlan {
        statement: Statement::new(sql, params),
        duplicate_checks,
    })
}

/// Builds a filtered `SELECT` over every column of a record type.
///
/// Non-empty filters without an explicit limit default to `LIMIT 1`. A
/// `Null` filter value matches with `IS NULL`; a record value matches by its
/// id.
///
/// # Errors
///
/// Returns [`QueryError::UnknownField`] for a filter on an undeclared field.
pub fn select_statement(
    record_type: &RecordType,
    filters: &[(&str, Value)],
    limit: Option<u64>,
) -> Result<SelectPlan> {
    let columns: Vec<String> = record_type
        .fields()
        .iter()
        .map(|(name, _)| quote_identifier(name))
        .collect();
    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_identifier(record_type.table_name())
    );

    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for (name, value) in filters {
        let field = record_type
            .field(name)
            .ok_or_else(|| QueryError::UnknownField {
                record_type: record_type.name().to_string(),
                field: (*name).to_string(),
            })?;
        if value.is_null() {
            conditions.push(format!("{} IS NULL", quote_identifier(name)));
        } else {
            conditions.push(format!("{} = ?", quote_identifier(name)));
            params.push(bind_value(field, value)?);
        }
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    let limit = match limit {
        None if !filters.is_empty() => Some(1),
        other => other,
    };
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok(SelectPlan {
        statement: Statement::new(sql, params),
        limit,
    })
}

/// Builds the `UPDATE` for a record's dirty fields.
///
/// Returns `None` when nothing is dirty. Reference values resolve to ids: a
/// record of the target type gives its id, integers and `Null` pass as-is.
///
/// # Errors
///
/// - [`LifecycleError::NotPersisted`] if the record has no id.
/// - [`ValidationError::TypeMismatch`] for a reference holding anything else.
pub fn update_statement(record: &Record) -> Result<Option<UpdatePlan>> {
    if record.dirty_fields().is_empty() {
        return Ok(None);
    }
    let id = record.id().ok_or(LifecycleError::NotPersisted)?;
    let record_type = record.record_type();

    let mut assignments = Vec::with_capacity(record.dirty_fields().len());
    for (name, value) in record.dirty_fields().iter() {
        let value = match record_type.field(name).and_then(Field::reference_target) {
            Some(target) => resolve_reference(target, value)
                .map_err(|err| OrmError::field(record_type.name(), name, err))?,
            None => value.clone(),
        };
        assignments.push((name.to_string(), value));
    }

    let set_clause: Vec<String> = assignments
        .iter()
        .map(|(name, _)| format!("{} = ?", quote_identifier(name)))
        .collect();
    let mut params: Vec<Value> = assignments.iter().map(|(_, value)| value.clone()).collect();
    params.push(Value::Integer(id));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote_identifier(record_type.table_name()),
        set_clause.join(", "),
        quote_identifier(ID_FIELD)
    );

    Ok(Some(UpdatePlan {
        statement: Statement::new(sql, params),
        assignments,
    }))
}

/// Builds the `DELETE` for a record.
///
/// # Errors
///
/// Returns [`LifecycleError::NotPersisted`] if the record has no id.
pub fn delete_statement(record: &Record) -> Result<Statement> {
    let id = record.id().ok_or(LifecycleError::NotPersisted)?;
    Ok(Statement::new(
        format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_identifier(record.record_type().table_name()),
            quote_identifier(ID_FIELD)
        ),
        vec![Value::Integer(id)],
    ))
}

/// Turns a stored value into a bindable parameter.
fn bind_value(field: &Field, value: &Value) -> Result<Value> {
    match value {
        Value::Record(record) => record.id().map(Value::Integer).ok_or_else(|| {
            ValidationError::MissingId {
                target: field
                    .reference_target()
                    .unwrap_or(record.record_type().name())
                    .to_string(),
            }
            .into()
        }),
        other => Ok(other.clone()),
    }
}

/// Resolves a pending reference value to the id written to the column.
fn resolve_reference(target: &str, value: &Value) -> std::result::Result<Value, ValidationError> {
    match value {
        Value::Record(record) if record.record_type().is_a(target) => record
            .id()
            .map(Value::Integer)
            .ok_or_else(|| ValidationError::MissingId {
                target: target.to_string(),
            }),
        Value::Integer(_) | Value::Null => Ok(value.clone()),
        other => Err(ValidationError::TypeMismatch {
            expected: format!("{target} record, integer id or null"),
            found: other.type_name(),
        }),
    }
}
