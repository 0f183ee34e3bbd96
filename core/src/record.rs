//! Live records: validated field values plus lifecycle state.
//!
//! A [`Record`] moves through a small state machine driven by the
//! [`Store`](crate::Store):
//!
//! ```text
//! Transient --insert--> Persisted --set(changed)--> Dirty --update--> Persisted
//!                           |                                  |
//!                           +-------------delete---------------+--> Deleted
//! ```
//!
//! Field writes go through [`Record::set`], which validates the value, keeps
//! `id` fixed once saved, refuses any change after deletion and records
//! changed fields of a persisted record in its [`DirtyFields`]. The lifecycle
//! flags and the dirty set are only changed by the persistence operations.

use std::fmt;
use std::sync::Arc;

use crate::error::{LifecycleError, OrmError, Result, ValidationError};
use crate::field::Field;
use crate::registry::{ID_FIELD, RESERVED_NAMES, RecordType};
use crate::value::Value;

/// Fields changed since the record was last persisted, with their pending
/// values. Read-only outside the crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyFields {
    entries: Vec<(String, Value)>,
}

impl DirtyFields {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, field: &str, value: Value) {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((field.to_string(), value)),
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// One row's worth of validated values of a registered record type.
#[derive(Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    values: Vec<Value>,
    saved: bool,
    updated: bool,
    deleted: bool,
    dirty: DirtyFields,
}

impl Record {
    /// Builds a transient record, validating every declared field.
    ///
    /// Each field takes the supplied value or, failing that, its default.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::UnknownField`] for a supplied name the type does
    ///   not declare.
    /// - [`OrmError::Field`] for the first field that fails validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use recordkit_core::{Field, RecordDecl, Record, Registry, Value};
    ///
    /// let registry = Registry::builder()
    ///     .register(RecordDecl::new("Person").field("name", Field::text()))
    ///     .build()
    ///     .unwrap();
    /// let person = registry.get("Person").unwrap();
    ///
    /// let carlos = Record::new(person, [("name", Value::from("Carlos"))]).unwrap();
    /// assert_eq!(carlos.get("name"), Some(&Value::from("Carlos")));
    /// assert_eq!(carlos.id(), None);
    /// assert!(!carlos.is_saved());
    ///
    /// assert!(Record::new(person, [("name", Value::from(1))]).is_err());
    /// ```
    pub fn new<I, K>(record_type: &Arc<RecordType>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut supplied: Vec<Option<Value>> = vec![None; record_type.fields().len()];
        for (name, value) in values {
            let name = name.as_ref();
            let idx = record_type
                .position(name)
                .ok_or_else(|| ValidationError::UnknownField {
                    record_type: record_type.name().to_string(),
                    field: name.to_string(),
                })?;
            supplied[idx] = Some(value);
        }

        let mut validated = Vec::with_capacity(supplied.len());
        for ((name, field), value) in record_type.fields().iter().zip(supplied) {
            let value = field
                .validate(value)
                .map_err(|err| OrmError::field(record_type.name(), name, err))?;
            validated.push(value);
        }

        Ok(Self {
            record_type: Arc::clone(record_type),
            values: validated,
            saved: false,
            updated: false,
            deleted: false,
            dirty: DirtyFields::default(),
        })
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    /// Current value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.record_type
            .position(field)
            .map(|idx| &self.values[idx])
    }

    /// Database id, once assigned.
    pub fn id(&self) -> Option<i64> {
        self.get(ID_FIELD).and_then(Value::as_integer)
    }

    /// Field values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.record_type
            .fields()
            .iter()
            .zip(&self.values)
            .map(|((name, _), value)| (name.as_str(), value))
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn dirty_fields(&self) -> &DirtyFields {
        &self.dirty
    }

    /// Assigns a field through validation and dirty tracking.
    ///
    /// On a persisted record, a value different from the current one is
    /// added to the dirty set and marks the record as updated; assigning the
    /// current value again changes nothing.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::ProtectedAttribute`] for lifecycle attribute names.
    /// - [`LifecycleError::Deleted`] once the record is deleted.
    /// - [`LifecycleError::IdImmutable`] for `id` on a saved record.
    /// - [`ValidationError::UnknownField`] for undeclared names.
    /// - [`OrmError::Field`] if the value fails validation.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        if RESERVED_NAMES.contains(&field) {
            return Err(LifecycleError::ProtectedAttribute(field.to_string()).into());
        }
        if self.deleted {
            return Err(LifecycleError::Deleted.into());
        }
        if field == ID_FIELD && self.saved {
            return Err(LifecycleError::IdImmutable.into());
        }
        let idx = self
            .record_type
            .position(field)
            .ok_or_else(|| ValidationError::UnknownField {
                record_type: self.record_type.name().to_string(),
                field: field.to_string(),
            })?;

        let descriptor = &self.record_type.fields()[idx].1;
        let value = descriptor
            .validate(Some(value.into()))
            .map_err(|err| OrmError::field(self.record_type.name(), field, err))?;

        if self.saved && !same_value(descriptor, &self.values[idx], &value) {
            self.dirty.insert(field, value.clone());
            self.updated = true;
        }
        self.values[idx] = value;
        Ok(())
    }

    /// Field name → value, in declaration order.
    ///
    /// Resolved references expand to the referenced record's own mapping.
    pub fn to_mapping(&self) -> serde_json::Map<String, serde_json::Value> {
        self.values()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }

    /// Restores a row read from storage as a persisted record.
    ///
    /// `id` is the generated id read from the row. A declared id column keeps
    /// the value it was built with when none is given.
    pub(crate) fn materialize(mut self, id: Option<i64>) -> Self {
        if let (Some(id), Some(idx)) = (id, self.record_type.position(ID_FIELD)) {
            self.values[idx] = Value::Integer(id);
        }
        self.saved = true;
        self
    }

    /// Replaces a reference id with the record it points to.
    pub(crate) fn resolve_reference(&mut self, idx: usize, target: Record) {
        self.values[idx] = Value::from(target);
    }

    /// Marks a successful insert, storing the generated id if any.
    pub(crate) fn mark_saved(&mut self, generated_id: Option<i64>) {
        if let (Some(id), Some(idx)) = (generated_id, self.record_type.position(ID_FIELD)) {
            self.values[idx] = Value::Integer(id);
        }
        self.saved = true;
    }

    /// Applies the values written by a successful update.
    pub(crate) fn mark_updated(&mut self, assignments: Vec<(String, Value)>) {
        for (field, value) in assignments {
            if let Some(idx) = self.record_type.position(&field) {
                self.values[idx] = value;
            }
        }
        self.dirty.clear();
        self.updated = false;
    }

    /// Marks a successful delete. Terminal.
    pub(crate) fn mark_deleted(&mut self) {
        self.saved = false;
        self.deleted = true;
    }
}

/// Compares a stored and a newly validated value, treating a resolved
/// reference and its id as the same value.
fn same_value(field: &Field, current: &Value, new: &Value) -> bool {
    if field.reference_target().is_some() {
        return reference_id(current) == reference_id(new);
    }
    current == new
}

fn reference_id(value: &Value) -> Option<i64> {
    match value {
        Value::Record(record) => record.id(),
        other => other.as_integer(),
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.record_type.name() == other.record_type.name() && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.values() {
            map.entry(&name, value);
        }
        map.finish()?;
        write!(
            f,
            " <{} saved={} updated={} deleted={}>",
            self.record_type.name(),
            self.saved,
            self.updated,
            self.deleted
        )
    }
}
