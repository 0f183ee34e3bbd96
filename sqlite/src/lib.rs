//! SQLite storage backend for recordkit.
//!
//! This crate connects the database-independent
//! [`Store`](recordkit_core::Store) to SQLite through rusqlite, and adds the
//! pieces a project needs around it: a YAML project file declaring the
//! models, and table migrations.
//!
//! # Architecture
//!
//! - **`executor`**: [`SqliteExecutor`], one transaction per session
//! - **`convert`**: record value ↔ SQLite value conversion
//! - **`config`**: [`ProjectConfig`] loaded from `recordkit.yaml`
//! - **`migration`**: table creation, removal and status
//!
//! # Quick start
//!
//! ```
//! use recordkit_core::{Field, RecordDecl, Registry, Store, Value};
//! use recordkit_sqlite::SqliteExecutor;
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
//! let mut store = Store::new(SqliteExecutor::open_in_memory().unwrap(), &registry);
//! store.create_all_tables().unwrap();
//!
//! let mut carlos = registry
//!     .new_record("Person", [("name", Value::from("Carlos")), ("age", Value::from(10))])
//!     .unwrap();
//! store.insert(&mut carlos).unwrap();
//!
//! let found = store
//!     .select("Person", &[("name", Value::from("Carlos"))], None)
//!     .unwrap()
//!     .one()
//!     .unwrap();
//! assert_eq!(found.to_mapping(), carlos.to_mapping());
//! ```

mod config;
mod convert;
mod error;
mod executor;
mod migration;

pub use config::{DEFAULT_CONFIG_FILE, DEFAULT_DATABASE, ProjectConfig};
pub use error::{Result, SqliteError};
pub use executor::{SqliteExecutor, SqliteSession};
pub use migration::{Migration, MigrationStatus, TableStatus};
