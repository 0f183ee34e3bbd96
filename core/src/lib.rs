//! Record schemas, validation and SQL generation for a small embedded ORM.
//!
//! This crate holds everything that does not need a database:
//!
//! - [`Field`]: a column descriptor with type, constraints and default.
//! - [`Registry`]: registered record types with their merged, ordered
//!   fields and the list of tables to create.
//! - [`Record`]: validated values of one row plus lifecycle state and
//!   dirty tracking.
//! - [`query`]: pure SQL generation (DDL, insert, select, update, delete).
//! - [`Store`]: persistence operations driven through the [`Executor`]
//!   trait, implemented by storage backends.
//! - [`ModelDecl`]: serde declarations for project files.
//!
//! # Example
//!
//! ```
//! use recordkit_core::*;
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
//! let mut carlos = registry
//!     .new_record("Person", [("name", Value::from("Carlos")), ("age", Value::from(10))])
//!     .unwrap();
//! carlos.set("age", 11).unwrap();
//! assert_eq!(carlos.get("age"), Some(&Value::from(11)));
//! assert!(carlos.set("age", "eleven").is_err());
//! ```

mod decl;
mod error;
mod executor;
mod field;
pub mod query;
mod record;
pub mod registry;
mod store;
mod value;

pub use decl::{FieldDecl, ModelDecl};
pub use error::{
    ErrorKind, LifecycleError, OrmError, QueryError, Result, SchemaError, ValidationError,
};
pub use executor::{Executed, Executor, Rows, Session};
pub use field::{Field, FieldKind};
pub use query::Statement;
pub use record::{DirtyFields, Record};
pub use registry::{RecordDecl, RecordType, Registry, RegistryBuilder};
pub use store::{MAX_REFERENCE_DEPTH, Selection, Store};
pub use value::{Value, ValueType};
