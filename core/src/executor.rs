//! Seam between the store and a SQL engine.
//!
//! The store never talks to a database directly. It opens a [`Session`] on
//! an [`Executor`], runs statements through it and commits. A session that
//! is dropped without [`Session::commit`] still keeps what it executed, so a
//! failing statement never rolls back earlier statements of the same
//! operation.

use std::error::Error;

use crate::query::Statement;
use crate::value::Value;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executed {
    pub affected_rows: usize,
    /// Rowid generated by the last insert of the session, if any.
    pub last_insert_id: Option<i64>,
}

/// Result set of a query: column names and raw values, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, as returned by `COUNT(*)` queries.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// A unit of work on the underlying engine.
pub trait Session {
    type Error: Error + Send + Sync + 'static;

    /// Runs a statement that produces no rows.
    fn execute(&mut self, statement: &Statement) -> Result<Executed, Self::Error>;

    /// Runs a query and collects every row.
    fn fetch_all(&mut self, statement: &Statement) -> Result<Rows, Self::Error>;

    /// Makes the session's work durable.
    fn commit(self) -> Result<(), Self::Error>;
}

/// Something that can open sessions, typically a database connection.
pub trait Executor {
    type Error: Error + Send + Sync + 'static;

    type Session<'s>: Session<Error = Self::Error>
    where
        Self: 's;

    fn session(&mut self) -> Result<Self::Session<'_>, Self::Error>;
}
