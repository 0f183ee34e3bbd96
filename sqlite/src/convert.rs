//! Conversion between record values and SQLite values.
//!
//! Booleans are stored as integers and related records as their id. Blobs
//! have no counterpart in the record value model and are rejected.

use recordkit_core::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::error::{Result, SqliteError};

/// Converts a record value into a bindable SQLite value.
pub(crate) fn to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Record(record) => match record.id() {
            Some(id) => SqlValue::Integer(id),
            None => {
                return Err(SqliteError::ConversionError(format!(
                    "cannot bind unsaved {} record",
                    record.record_type().name()
                )));
            }
        },
    })
}

/// Converts every statement parameter, in order.
pub(crate) fn to_params(params: &[Value]) -> Result<Vec<SqlValue>> {
    params.iter().map(to_sql).collect()
}

/// Reads a column value as returned by SQLite.
///
/// Declared types are not applied here; callers decode against the field.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),
        ValueRef::Real(r) => Ok(Value::Real(r)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(Value::from)
            .map_err(|e| SqliteError::ConversionError(format!("invalid UTF-8 text: {e}"))),
        ValueRef::Blob(_) => Err(SqliteError::ConversionError(
            "blob columns are not supported".to_string(),
        )),
    }
}
