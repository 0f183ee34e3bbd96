//! Table lifecycle for the record types of a registry.
//!
//! Provides [`Migration`] for creating and dropping the tables of every
//! registered record type and for reporting which of them exist.
//!
//! # Example
//!
//! ```no_run
//! use recordkit_sqlite::{Migration, ProjectConfig, SqliteExecutor};
//!
//! let config = ProjectConfig::load("recordkit.yaml").unwrap();
//! let registry = config.registry().unwrap();
//! let executor = SqliteExecutor::open(&config.database).unwrap();
//! let mut migration = Migration::new(executor, &registry);
//!
//! migration.up().unwrap();
//! for table in migration.status().unwrap().tables {
//!     println!("{}: {} rows", table.name, table.row_count);
//! }
//! ```

use recordkit_core::query::quote_identifier;
use recordkit_core::{RecordType, Registry, Store};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Result, SqliteError};
use crate::executor::SqliteExecutor;

/// Manages the tables of a registry's record types.
pub struct Migration<'r> {
    store: Store<'r, SqliteExecutor>,
}

impl<'r> Migration<'r> {
    pub fn new(executor: SqliteExecutor, registry: &'r Registry) -> Self {
        Self {
            store: Store::new(executor, registry),
        }
    }

    /// Creates every table that does not exist yet.
    ///
    /// Uses `CREATE TABLE IF NOT EXISTS` so it is safe to call multiple times.
    /// Returns the number of tables covered.
    pub fn up(&mut self) -> Result<usize> {
        Ok(self.store.create_all_tables()?)
    }

    /// Drops every table, each before the tables it references.
    ///
    /// Uses `DROP TABLE IF EXISTS` and runs in one transaction.
    pub fn down(&mut self) -> Result<()> {
        let tables = drop_order(self.store.registry());
        let tx = self.store.executor_mut().connection_mut().transaction()?;
        for record_type in tables {
            let sql = format!(
                "DROP TABLE IF EXISTS {}",
                quote_identifier(record_type.table_name())
            );
            tx.execute_batch(&sql).map_err(|e| {
                SqliteError::MigrationError(format!(
                    "failed to drop table '{}': {e}",
                    record_type.table_name()
                ))
            })?;
            info!(table = %record_type.table_name(), "dropped table");
        }
        tx.commit()?;
        Ok(())
    }

    /// Reports existence and row count of every table.
    pub fn status(&self) -> Result<MigrationStatus> {
        let conn = self.store.executor().connection();
        let mut tables = Vec::with_capacity(self.store.registry().tables().len());
        for record_type in self.store.registry().tables() {
            let name = record_type.table_name().to_string();
            let exists = table_exists(conn, &name)?;
            let row_count = if exists { count_rows(conn, &name)? } else { 0 };
            tables.push(TableStatus {
                name,
                exists,
                row_count,
            });
        }
        Ok(MigrationStatus { tables })
    }

    /// Gives back the store for record operations.
    pub fn into_store(self) -> Store<'r, SqliteExecutor> {
        self.store
    }
}

/// Orders tables so that a table holding references is dropped before the
/// tables it points to. Ties and reference cycles fall back to reverse
/// registration order.
fn drop_order(registry: &Registry) -> Vec<&RecordType> {
    let mut remaining: Vec<(&RecordType, Vec<&str>)> = registry
        .tables()
        .iter()
        .map(|record_type| {
            let record_type: &RecordType = record_type;
            (record_type, referenced_tables(registry, record_type))
        })
        .collect();

    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let is_referenced = |name: &str| {
            remaining
                .iter()
                .any(|(other, targets)| {
                    other.table_name() != name && targets.iter().any(|target| *target == name)
                })
        };
        let next = remaining
            .iter()
            .rposition(|(record_type, _)| !is_referenced(record_type.table_name()))
            .unwrap_or(remaining.len() - 1);
        order.push(remaining.remove(next).0);
    }
    order
}

fn referenced_tables<'a>(registry: &'a Registry, record_type: &RecordType) -> Vec<&'a str> {
    record_type
        .references()
        .filter_map(|(_, _, target)| registry.get(target).ok())
        .map(|target| target.table_name())
        .collect()
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn count_rows(conn: &Connection, name: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_identifier(name)),
        [],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// State of the registry's tables in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// One entry per table, in registration order.
    pub tables: Vec<TableStatus>,
}

impl MigrationStatus {
    /// Returns `true` if every table exists.
    pub fn tables_exist(&self) -> bool {
        self.tables.iter().all(|table| table.exists)
    }

    /// Total rows across all existing tables.
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|table| table.row_count).sum()
    }
}

/// State of a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub name: String,
    pub exists: bool,
    pub row_count: usize,
}
