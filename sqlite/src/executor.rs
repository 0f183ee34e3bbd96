//! [`Executor`] implementation over a rusqlite connection.
//!
//! Each session is a transaction whose drop behavior is commit, so work done
//! before an error inside the session is kept rather than rolled back.

use std::path::Path;

use recordkit_core::{Executed, Executor, Rows, Session, Statement};
use rusqlite::{Connection, DropBehavior, Transaction, params_from_iter};
use tracing::debug;

use crate::convert;
use crate::error::{Result, SqliteError};

/// A SQLite connection usable by a [`Store`](recordkit_core::Store).
///
/// # Examples
///
/// ```
/// use recordkit_core::{Field, RecordDecl, Registry, Store, Value};
/// use recordkit_sqlite::SqliteExecutor;
///
/// let registry = Registry::builder()
///     .register(RecordDecl::new("Person").field("name", Field::text()))
///     .build()
///     .unwrap();
/// let mut store = Store::new(SqliteExecutor::open_in_memory().unwrap(), &registry);
/// store.create_all_tables().unwrap();
///
/// let mut ana = registry.new_record("Person", [("name", Value::from("Ana"))]).unwrap();
/// store.insert(&mut ana).unwrap();
/// assert_eq!(ana.id(), Some(1));
/// ```
#[derive(Debug)]
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening database");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wraps an existing connection, enabling foreign key enforcement.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl Executor for SqliteExecutor {
    type Error = SqliteError;
    type Session<'s> = SqliteSession<'s>;

    fn session(&mut self) -> Result<SqliteSession<'_>> {
        let mut tx = self.conn.transaction()?;
        tx.set_drop_behavior(DropBehavior::Commit);
        Ok(SqliteSession { tx })
    }
}

/// One transaction on a [`SqliteExecutor`].
pub struct SqliteSession<'c> {
    tx: Transaction<'c>,
}

impl Session for SqliteSession<'_> {
    type Error = SqliteError;

    fn execute(&mut self, statement: &Statement) -> Result<Executed> {
        let params = convert::to_params(&statement.params)?;
        let affected_rows = self.tx.execute(&statement.sql, params_from_iter(params.iter()))?;
        let rowid = self.tx.last_insert_rowid();
        Ok(Executed {
            affected_rows,
            last_insert_id: (rowid != 0).then_some(rowid),
        })
    }

    fn fetch_all(&mut self, statement: &Statement) -> Result<Rows> {
        let params = convert::to_params(&statement.params)?;
        let mut stmt = self.tx.prepare(&statement.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(convert::from_sql(row.get_ref(idx)?)?);
            }
            rows.push(values);
        }
        Ok(Rows { columns, rows })
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}
