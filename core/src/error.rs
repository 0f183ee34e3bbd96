//! Error types for schema declaration, validation, record lifecycle and
//! query generation.
//!
//! Each failure family has its own enum so callers can match on the exact
//! violation; [`OrmError`] wraps all of them (plus executor failures) and
//! [`OrmError::kind`] classifies any error into an [`ErrorKind`].

use thiserror::Error;

/// Coarse classification of an [`OrmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid declarations or DDL generation failures.
    Schema,
    /// A value does not satisfy its field descriptor.
    Validation,
    /// An operation is not allowed in the record's current lifecycle state.
    Lifecycle,
    /// A query references something the schema does not know.
    Query,
    /// The SQL executor collaborator failed.
    Executor,
}

/// Errors raised while declaring record types or generating DDL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A value type name could not be mapped to a column type.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// A column produced no SQL metadata.
    #[error("field '{column}' of table '{table}' has no metadata")]
    EmptyMetadata { table: String, column: String },

    /// A field declaration omits its value type.
    #[error("field '{0}' does not declare a type")]
    MissingType(String),

    /// A declared default cannot be represented as a scalar value.
    #[error("unsupported default for field '{0}': only scalars are allowed")]
    UnsupportedDefault(String),

    /// Two record types share a name or table name.
    #[error("record type '{0}' is registered more than once")]
    DuplicateRecordType(String),

    /// A record type extends a type that was not registered before it.
    #[error("record type '{record_type}' extends unknown type '{parent}'")]
    UnknownParent { record_type: String, parent: String },

    /// A reference field points at a record type that is never registered.
    #[error("field '{field}' of '{record_type}' references unknown type '{target}'")]
    UnknownReferenceTarget {
        record_type: String,
        field: String,
        target: String,
    },

    /// A field name collides with the record lifecycle attributes.
    #[error("field name '{0}' is reserved")]
    ReservedFieldName(String),

    /// A record type or field name is not a plain SQL identifier.
    #[error("invalid identifier '{0}': must start with a letter or underscore and contain only alphanumerics and underscores")]
    InvalidIdentifier(String),

    /// The process-wide registry was installed twice.
    #[error("the global registry is already installed")]
    RegistryInstalled,

    /// The process-wide registry was read before installation.
    #[error("the global registry has not been installed")]
    RegistryNotInstalled,
}

/// Errors raised when a value does not satisfy a field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No value, no default, and the field is neither nullable nor blank.
    #[error("a value is required for this field")]
    MissingValue,

    /// The value has the wrong type.
    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    /// A reference id is not strictly positive.
    #[error("reference id must be a positive integer, got {0}")]
    InvalidForeignKey(i64),

    /// A referenced record has not been assigned an id yet.
    #[error("the referenced {target} record has no id")]
    MissingId { target: String },

    /// An auto-increment value was assigned by hand.
    #[error("manual assignment of an auto-increment field is not allowed")]
    ManualAutoIncrement,

    /// A real default is NaN or infinite and has no SQL literal.
    #[error("default must be a finite number, got {0}")]
    NonFiniteDefault(String),

    /// A manually assigned id already exists in the table.
    #[error("id {id} already exists in table '{table}'")]
    DuplicateId { table: String, id: i64 },

    /// A value was supplied for a field the record type does not declare.
    #[error("'{record_type}' has no field named '{field}'")]
    UnknownField { record_type: String, field: String },
}

/// Errors raised when an operation conflicts with a record's lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The record was deleted and can no longer change.
    #[error("deleted records cannot be changed")]
    Deleted,

    /// The record was deleted and cannot be persisted again.
    #[error("deleted records cannot be saved, updated or deleted")]
    AlreadyDeleted,

    /// A lifecycle attribute was assigned from outside the persistence layer.
    #[error("the '{0}' attribute cannot be changed directly")]
    ProtectedAttribute(String),

    /// The operation needs a record that was saved to the database.
    #[error("only records saved in the database can be updated or deleted")]
    NotPersisted,

    /// The id of a saved record was reassigned.
    #[error("the id of a record saved in the database cannot be changed")]
    IdImmutable,
}

/// Errors raised while building a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A filter names a field the record type does not declare.
    #[error("the '{field}' field does not exist in '{record_type}'")]
    UnknownField { record_type: String, field: String },

    /// A query names a record type that is not registered.
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),
}

/// Unified error for every recordkit operation.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A validation failure attributed to one field of a record type.
    #[error("validation error on {record_type}.{field}: {source}")]
    Field {
        record_type: String,
        field: String,
        #[source]
        source: ValidationError,
    },

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Failure reported by the SQL executor collaborator.
    #[error("executor error: {0}")]
    Executor(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl OrmError {
    /// Wraps an executor failure.
    pub fn executor<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Executor(Box::new(err))
    }

    /// Attributes a field validation failure to `record_type.field`.
    pub fn field(record_type: &str, field: &str, source: ValidationError) -> Self {
        Self::Field {
            record_type: record_type.to_string(),
            field: field.to_string(),
            source,
        }
    }

    /// Returns the error family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Validation(_) | Self::Field { .. } => ErrorKind::Validation,
            Self::Lifecycle(_) => ErrorKind::Lifecycle,
            Self::Query(_) => ErrorKind::Query,
            Self::Executor(_) => ErrorKind::Executor,
        }
    }

    /// Returns the underlying validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) | Self::Field { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`OrmError`].
pub type Result<T> = std::result::Result<T, OrmError>;
