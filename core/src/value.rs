//! Column value types and the dynamic value carried by records.
//!
//! [`ValueType`] is the closed set of column types a field can declare.
//! [`Value`] holds one field's data; besides the four scalar types it can
//! carry a whole [`Record`], which is how resolved references are
//! represented after a select.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::record::Record;

/// Declared type of a field.
///
/// # Examples
///
/// ```
/// use recordkit_core::ValueType;
///
/// assert_eq!("int".parse::<ValueType>().unwrap(), ValueType::Integer);
/// assert_eq!("str".parse::<ValueType>().unwrap(), ValueType::Text);
/// assert!("list".parse::<ValueType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Text,
    Real,
    Boolean,
}

impl ValueType {
    /// Lower-case name used in messages and declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Real => "real",
            Self::Boolean => "boolean",
        }
    }

    /// Returns `true` if `value` is a non-null value of this type.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Integer, Value::Integer(_))
                | (Self::Text, Value::Text(_))
                | (Self::Real, Value::Real(_))
                | (Self::Boolean, Value::Boolean(_))
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Integer),
            "str" | "string" | "text" => Ok(Self::Text),
            "float" | "real" => Ok(Self::Real),
            "bool" | "boolean" => Ok(Self::Boolean),
            _ => Err(SchemaError::UnsupportedType(s.to_string())),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    /// A related record, present after a select resolves a reference.
    Record(Box<Record>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Name of the value's runtime type, used in mismatch messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Integer(_) => "integer".to_string(),
            Self::Real(_) => "real".to_string(),
            Self::Text(_) => "text".to_string(),
            Self::Boolean(_) => "boolean".to_string(),
            Self::Record(record) => format!("{} record", record.record_type().name()),
        }
    }

    /// Renders the value as a SQL literal for `DEFAULT` clauses.
    pub fn sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Real(r) => r.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Boolean(true) => "TRUE".to_string(),
            Self::Boolean(false) => "FALSE".to_string(),
            Self::Record(record) => record
                .id()
                .map_or_else(|| "NULL".to_string(), |id| id.to_string()),
        }
    }

    /// Converts the value to JSON; records expand to their mapping.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Record(record) => serde_json::Value::Object(record.to_mapping()),
        }
    }

    /// Builds a scalar value from JSON, as found in declaration files.
    ///
    /// Returns `None` for arrays and objects.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Real)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Record(record) => match record.id() {
                Some(id) => write!(f, "{}({id})", record.record_type().name()),
                None => write!(f, "{}(unsaved)", record.record_type().name()),
            },
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(Box::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
