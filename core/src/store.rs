//! Persistence operations over an [`Executor`].
//!
//! [`Store`] pairs a registry with an executor and drives records through
//! their lifecycle: table creation, insert, select, update and delete. Each
//! operation opens one session, so every statement of an operation shares a
//! single commit scope. Lifecycle flags on the record only change once the
//! statements have succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{LifecycleError, OrmError, QueryError, Result, SchemaError, ValidationError};
use crate::executor::{Executed, Executor, Rows, Session};
use crate::field::FieldKind;
use crate::query::{
    Statement, create_table_statement, delete_statement, insert_statement, select_statement,
    update_statement,
};
use crate::record::Record;
use crate::registry::{self, ID_FIELD, RecordType, Registry};
use crate::value::Value;

/// Nesting limit when resolving references during a select.
///
/// Past this depth the raw id is kept, which bounds self-referencing rows.
pub const MAX_REFERENCE_DEPTH: usize = 16;

/// Referenced rows already selected during one top-level select, keyed by
/// record type and id. `None` marks an id with no row.
type ReferenceCache = HashMap<(String, i64), Option<Record>>;

/// Rows returned by [`Store::select`].
///
/// A select whose effective limit is one yields [`Selection::One`]; any other
/// select yields [`Selection::Many`].
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Selection {
    /// The single record, or the first of many.
    pub fn one(self) -> Option<Record> {
        match self {
            Self::One(record) => record,
            Self::Many(records) => records.into_iter().next(),
        }
    }

    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Self::One(record) => record.into_iter().collect(),
            Self::Many(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(record) => usize::from(record.is_some()),
            Self::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry-aware persistence on top of an executor.
pub struct Store<'r, E> {
    registry: &'r Registry,
    executor: E,
}

impl<E: Executor> Store<'static, E> {
    /// Creates a store over the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RegistryNotInstalled`] if no registry was
    /// installed.
    pub fn with_global_registry(executor: E) -> Result<Self> {
        let registry = registry::global().ok_or(SchemaError::RegistryNotInstalled)?;
        Ok(Self::new(executor, registry))
    }
}

impl<'r, E: Executor> Store<'r, E> {
    pub fn new(executor: E, registry: &'r Registry) -> Self {
        Self { registry, executor }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Creates the table of every record type that extends the base record.
    ///
    /// All statements run in one session. Returns the number of tables.
    pub fn create_all_tables(&mut self) -> Result<usize> {
        let mut session = self.executor.session().map_err(OrmError::executor)?;
        let mut created = 0;
        for record_type in self.registry.tables() {
            let sql = create_table_statement(record_type, true)?;
            execute(&mut session, &Statement::new(sql, Vec::new()))?;
            info!(table = %record_type.table_name(), "created table");
            created += 1;
        }
        session.commit().map_err(OrmError::executor)?;
        Ok(created)
    }

    /// Inserts a record and marks it saved.
    ///
    /// The generated row id is stored in `id` when the database assigned one.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyDeleted`] for a deleted record.
    /// - [`ValidationError::DuplicateId`] if a manually assigned id is taken.
    /// - Any executor failure, leaving the record unsaved.
    pub fn insert(&mut self, record: &mut Record) -> Result<()> {
        if record.is_deleted() {
            return Err(LifecycleError::AlreadyDeleted.into());
        }
        let plan = insert_statement(record)?;

        let mut session = self.executor.session().map_err(OrmError::executor)?;
        for check in &plan.duplicate_checks {
            let count = fetch(&mut session, &check.statement)?
                .scalar()
                .and_then(Value::as_integer)
                .unwrap_or(0);
            if count > 0 {
                return Err(ValidationError::DuplicateId {
                    table: record.record_type().table_name().to_string(),
                    id: check.value,
                }
                .into());
            }
        }
        let executed = execute(&mut session, &plan.statement)?;
        session.commit().map_err(OrmError::executor)?;

        let generated = if record.record_type().has_auto_increment() && record.id().is_none() {
            executed.last_insert_id
        } else {
            None
        };
        record.mark_saved(generated);
        debug!(
            record_type = %record.record_type().name(),
            id = ?record.id(),
            "inserted record"
        );
        Ok(())
    }

    /// Selects records of a type matching every filter.
    ///
    /// Rows come back as saved records with `id` restored. Non-null reference
    /// columns are replaced with the referenced record, selected in turn. Each
    /// referenced row is selected at most once per call.
    ///
    /// # Errors
    ///
    /// Fails for an unknown record type or filter field, a row that does not
    /// validate against the declaration, or any executor failure.
    pub fn select(
        &mut self,
        record_type: &str,
        filters: &[(&str, Value)],
        limit: Option<u64>,
    ) -> Result<Selection> {
        self.select_at_depth(record_type, filters, limit, 0, &mut ReferenceCache::new())
    }

    /// Writes a record's dirty fields.
    ///
    /// Returns `false` without touching the database when nothing is dirty.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyDeleted`] for a deleted record.
    /// - [`LifecycleError::NotPersisted`] for a record that was never saved.
    pub fn update(&mut self, record: &mut Record) -> Result<bool> {
        ensure_persisted(record)?;
        let Some(plan) = update_statement(record)? else {
            debug!(record_type = %record.record_type().name(), "nothing to update");
            return Ok(false);
        };

        let mut session = self.executor.session().map_err(OrmError::executor)?;
        execute(&mut session, &plan.statement)?;
        session.commit().map_err(OrmError::executor)?;

        record.mark_updated(plan.assignments);
        Ok(true)
    }

    /// Deletes a record's row. The record can no longer be changed.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyDeleted`] for a deleted record.
    /// - [`LifecycleError::NotPersisted`] for a record that was never saved.
    pub fn delete(&mut self, record: &mut Record) -> Result<bool> {
        ensure_persisted(record)?;
        let statement = delete_statement(record)?;

        let mut session = self.executor.session().map_err(OrmError::executor)?;
        execute(&mut session, &statement)?;
        session.commit().map_err(OrmError::executor)?;

        record.mark_deleted();
        Ok(true)
    }

    fn select_at_depth(
        &mut self,
        record_type: &str,
        filters: &[(&str, Value)],
        limit: Option<u64>,
        depth: usize,
        cache: &mut ReferenceCache,
    ) -> Result<Selection> {
        let record_type = Arc::clone(self.registry.get(record_type)?);
        let plan = select_statement(&record_type, filters, limit)?;

        let rows = {
            let mut session = self.executor.session().map_err(OrmError::executor)?;
            let rows = fetch(&mut session, &plan.statement)?;
            session.commit().map_err(OrmError::executor)?;
            rows
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows.rows {
            let mut record = materialize(&record_type, &rows.columns, row)?;
            self.resolve_references(&mut record, depth, cache)?;
            records.push(record);
        }

        Ok(match plan.limit {
            Some(1) => Selection::One(records.into_iter().next()),
            _ => Selection::Many(records),
        })
    }

    fn resolve_references(
        &mut self,
        record: &mut Record,
        depth: usize,
        cache: &mut ReferenceCache,
    ) -> Result<()> {
        let references: Vec<(usize, String, String)> = record
            .record_type()
            .references()
            .map(|(idx, field, target)| (idx, field.to_string(), target.to_string()))
            .collect();

        for (idx, field, target) in references {
            let Some(id) = record.get(&field).and_then(Value::as_integer) else {
                continue;
            };
            if depth >= MAX_REFERENCE_DEPTH {
                warn!(field = %field, target = %target, id, "reference nesting too deep, keeping id");
                continue;
            }
            let key = (target.clone(), id);
            let related = match cache.get(&key) {
                Some(cached) => cached.clone(),
                None => {
                    let related = self
                        .select_at_depth(
                            &target,
                            &[(ID_FIELD, Value::Integer(id))],
                            None,
                            depth + 1,
                            cache,
                        )?
                        .one();
                    cache.insert(key, related.clone());
                    related
                }
            };
            match related {
                Some(related) => record.resolve_reference(idx, related),
                None => warn!(field = %field, target = %target, id, "referenced row not found"),
            }
        }
        Ok(())
    }
}

fn ensure_persisted(record: &Record) -> Result<()> {
    if record.is_deleted() {
        return Err(LifecycleError::AlreadyDeleted.into());
    }
    if !record.is_saved() {
        return Err(LifecycleError::NotPersisted.into());
    }
    Ok(())
}

/// Rebuilds a saved record from one result row.
fn materialize(record_type: &Arc<RecordType>, columns: &[String], row: Vec<Value>) -> Result<Record> {
    let mut id = None;
    let mut values = Vec::with_capacity(row.len());
    for (column, stored) in columns.iter().zip(row) {
        let field = record_type
            .field(column)
            .ok_or_else(|| QueryError::UnknownField {
                record_type: record_type.name().to_string(),
                field: column.clone(),
            })?;
        if column == ID_FIELD && matches!(field.kind(), FieldKind::AutoPrimaryKey { .. }) {
            id = stored.as_integer();
            continue;
        }
        values.push((column.as_str(), field.decode(stored)));
    }
    Ok(Record::new(record_type, values)?.materialize(id))
}

fn execute<S: Session>(session: &mut S, statement: &Statement) -> Result<Executed> {
    debug!(sql = %statement.sql, params = statement.params.len(), "executing statement");
    session.execute(statement).map_err(OrmError::executor)
}

fn fetch<S: Session>(session: &mut S, statement: &Statement) -> Result<Rows> {
    debug!(sql = %statement.sql, params = statement.params.len(), "running query");
    session.fetch_all(statement).map_err(OrmError::executor)
}
