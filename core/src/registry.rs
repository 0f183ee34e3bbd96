//! Record type declaration and the schema registry.
//!
//! Record types are declared with [`RecordDecl`] and registered through a
//! [`RegistryBuilder`]. Building the registry merges every type's inherited
//! fields (base first, so a local field overrides an inherited one of the
//! same name), checks that parents and reference targets exist, and records
//! which types get a table.
//!
//! Every type implicitly extends the base record, which contributes a single
//! auto-increment `id` field. Only types that extend the base record directly
//! are listed in [`Registry::tables`]; deeper subtypes share their fields but
//! are not created by bulk table creation.
//!
//! # Process-wide registry
//!
//! Programs that want one registry for their whole lifetime build it during
//! startup and hand it to [`install`]. After that it is read-only and
//! available through [`global`]. Installing twice is an error.
//!
//! # Examples
//!
//! ```
//! use recordkit_core::{Field, RecordDecl, Registry};
//!
//! let registry = Registry::builder()
//!     .register(
//!         RecordDecl::new("Person")
//!             .field("name", Field::text())
//!             .field("age", Field::integer()),
//!     )
//!     .register(RecordDecl::new("Pet").field("owner", Field::reference("Person")))
//!     .build()
//!     .unwrap();
//!
//! let names: Vec<_> = registry.fields_of("Person").unwrap().iter().map(|(n, _)| n.as_str()).collect();
//! assert_eq!(names, ["id", "name", "age"]);
//! assert_eq!(registry.tables().len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{OrmError, QueryError, Result, SchemaError};
use crate::field::Field;
use crate::record::Record;
use crate::value::Value;

/// Field names reserved for record lifecycle state.
pub const RESERVED_NAMES: &[&str] = &["saved", "updated", "deleted", "dirty_fields"];

/// Name of the implicit primary key field.
pub const ID_FIELD: &str = "id";

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Installs the process-wide registry.
///
/// # Errors
///
/// Returns [`SchemaError::RegistryInstalled`] if a registry was already
/// installed.
pub fn install(registry: Registry) -> std::result::Result<&'static Registry, SchemaError> {
    GLOBAL
        .set(registry)
        .map_err(|_| SchemaError::RegistryInstalled)?;
    GLOBAL.get().ok_or(SchemaError::RegistryNotInstalled)
}

/// Returns the process-wide registry, if one was installed.
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}

/// Checks that a name is a plain SQL identifier.
pub(crate) fn validate_identifier(name: &str) -> std::result::Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SchemaError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Declaration of one record type, before registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    name: String,
    parent: Option<String>,
    fields: Vec<(String, Field)>,
}

impl RecordDecl {
    /// Starts a declaration that extends the base record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Extends another registered record type instead of the base record.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares a field. Redeclaring a name replaces the earlier field.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// A registered record type with its merged, ordered field map.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    name: String,
    table: String,
    lineage: Vec<String>,
    fields: Vec<(String, Field)>,
}

impl RecordType {
    /// Declared type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name: the lower-cased type name.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Ordered fields, starting with the inherited `id`.
    pub fn fields(&self) -> &[(String, Field)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.position(name).map(|idx| &self.fields[idx].1)
    }

    /// Index of a field in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }

    /// Column name → SQL metadata, in declaration order.
    pub fn metadata(&self) -> Vec<(String, Vec<String>)> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.metadata()))
            .collect()
    }

    /// Returns `true` if this type is `name` or extends it.
    pub fn is_a(&self, name: &str) -> bool {
        self.lineage.iter().any(|ancestor| ancestor == name)
    }

    /// Returns `true` if any field is auto-incremented by the database.
    pub fn has_auto_increment(&self) -> bool {
        self.fields.iter().any(|(_, field)| field.is_auto_increment())
    }

    /// Fields holding references to other record types.
    pub fn references(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(idx, (name, field))| {
                field
                    .reference_target()
                    .map(|target| (idx, name.as_str(), target))
            })
    }
}

/// Collects declarations and builds a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    decls: Vec<RecordDecl>,
}

impl RegistryBuilder {
    /// Adds a record type declaration.
    pub fn register(mut self, decl: RecordDecl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Merges inherited fields and validates the declarations.
    ///
    /// Parents must be registered before their subtypes. Reference targets
    /// may be registered in any order, so mutually referencing types work.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for invalid or reserved names, duplicate
    /// types, unknown parents and unknown reference targets.
    pub fn build(self) -> std::result::Result<Registry, SchemaError> {
        let mut types: Vec<Arc<RecordType>> = Vec::with_capacity(self.decls.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut tables = Vec::new();

        for decl in self.decls {
            validate_identifier(&decl.name)?;
            let table = decl.name.to_lowercase();
            if types.iter().any(|t| t.table == table) {
                return Err(SchemaError::DuplicateRecordType(decl.name));
            }

            let (mut fields, mut lineage) = match &decl.parent {
                None => (vec![(ID_FIELD.to_string(), Field::auto_primary_key())], Vec::new()),
                Some(parent) => {
                    let parent_type = index.get(parent).map(|&idx| &types[idx]).ok_or_else(|| {
                        SchemaError::UnknownParent {
                            record_type: decl.name.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    (parent_type.fields.clone(), parent_type.lineage.clone())
                }
            };

            for (name, field) in decl.fields {
                validate_identifier(&name)?;
                if RESERVED_NAMES.contains(&name.as_str()) {
                    return Err(SchemaError::ReservedFieldName(name));
                }
                match fields.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(slot) => slot.1 = field,
                    None => fields.push((name, field)),
                }
            }

            lineage.insert(0, decl.name.clone());
            let record_type = Arc::new(RecordType {
                name: decl.name.clone(),
                table,
                lineage,
                fields,
            });
            if decl.parent.is_none() {
                tables.push(Arc::clone(&record_type));
            }
            index.insert(decl.name, types.len());
            types.push(record_type);
        }

        for record_type in &types {
            for (_, field, target) in record_type.references() {
                if !index.contains_key(target) {
                    return Err(SchemaError::UnknownReferenceTarget {
                        record_type: record_type.name.clone(),
                        field: field.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(Registry {
            types,
            index,
            tables,
        })
    }
}

/// Every registered record type plus the list of tables to create.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: Vec<Arc<RecordType>>,
    index: HashMap<String, usize>,
    tables: Vec<Arc<RecordType>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up a record type by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRecordType`] for unregistered names.
    pub fn get(&self, name: &str) -> std::result::Result<&Arc<RecordType>, QueryError> {
        self.index
            .get(name)
            .map(|&idx| &self.types[idx])
            .ok_or_else(|| QueryError::UnknownRecordType(name.to_string()))
    }

    /// Ordered fields of a record type, always starting with `id`.
    pub fn fields_of(&self, name: &str) -> std::result::Result<&[(String, Field)], QueryError> {
        Ok(self.get(name)?.fields())
    }

    /// Column metadata of a record type, used for DDL generation.
    pub fn metadata_of(
        &self,
        name: &str,
    ) -> std::result::Result<Vec<(String, Vec<String>)>, QueryError> {
        Ok(self.get(name)?.metadata())
    }

    /// Record types that extend the base record directly, in registration order.
    pub fn tables(&self) -> &[Arc<RecordType>] {
        &self.tables
    }

    /// All registered record types, in registration order.
    pub fn record_types(&self) -> impl Iterator<Item = &Arc<RecordType>> {
        self.types.iter()
    }

    /// Constructs a validated, unsaved record of the named type.
    ///
    /// # Errors
    ///
    /// Fails for an unknown type name or any field validation failure.
    pub fn new_record<I, K>(&self, name: &str, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let record_type = self.get(name).map_err(OrmError::from)?;
        Record::new(record_type, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> RegistryBuilder {
        Registry::builder().register(
            RecordDecl::new("Person")
                .field("name", Field::text())
                .field("age", Field::integer()),
        )
    }

    #[test]
    fn test_id_is_first_and_implicit() {
        let registry = people().build().unwrap();
        let person = registry.get("Person").unwrap();
        assert_eq!(person.table_name(), "person");
        assert_eq!(person.fields()[0].0, "id");
        assert_eq!(person.fields()[0].1, Field::auto_primary_key());
        assert!(person.has_auto_increment());
    }

    #[test]
    fn test_subtype_inherits_and_overrides() {
        let registry = people()
            .register(
                RecordDecl::new("Employee")
                    .extends("Person")
                    .field("age", Field::integer().nullable())
                    .field("salary", Field::real()),
            )
            .build()
            .unwrap();

        let employee = registry.get("Employee").unwrap();
        let names: Vec<_> = employee.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["id", "name", "age", "salary"]);
        assert!(employee.field("age").unwrap().is_nullable());
        assert!(employee.is_a("Person"));
        assert!(employee.is_a("Employee"));
        assert!(!registry.get("Person").unwrap().is_a("Employee"));

        // Only direct subtypes of the base record get a table.
        let tables: Vec<_> = registry.tables().iter().map(|t| t.name()).collect();
        assert_eq!(tables, ["Person"]);
    }

    #[test]
    fn test_local_id_override_keeps_position() {
        let registry = Registry::builder()
            .register(
                RecordDecl::new("Tag")
                    .field("label", Field::text())
                    .field("id", Field::auto_primary_key().allow_manual()),
            )
            .build()
            .unwrap();
        let tag = registry.get("Tag").unwrap();
        assert_eq!(tag.position("id"), Some(0));
        assert_eq!(tag.field("id"), Some(&Field::auto_primary_key().allow_manual()));
    }

    #[test]
    fn test_metadata_of() {
        let registry = people().build().unwrap();
        let meta = registry.metadata_of("Person").unwrap();
        assert_eq!(
            meta,
            vec![
                (
                    "id".to_string(),
                    vec![
                        "INTEGER".to_string(),
                        "PRIMARY KEY".to_string(),
                        "AUTOINCREMENT".to_string()
                    ]
                ),
                (
                    "name".to_string(),
                    vec!["TEXT".to_string(), "NOT NULL".to_string()]
                ),
                (
                    "age".to_string(),
                    vec!["INT".to_string(), "NOT NULL".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let err = Registry::builder()
            .register(RecordDecl::new("Employee").extends("Person"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownParent {
                record_type: "Employee".to_string(),
                parent: "Person".to_string(),
            }
        );
    }

    #[test]
    fn test_references_may_point_forward() {
        let registry = Registry::builder()
            .register(RecordDecl::new("Pet").field("owner", Field::reference("Person")))
            .register(RecordDecl::new("Person").field("name", Field::text()))
            .build()
            .unwrap();
        let refs: Vec<_> = registry.get("Pet").unwrap().references().collect();
        assert_eq!(refs, vec![(1, "owner", "Person")]);
    }

    #[test]
    fn test_unknown_reference_target_is_rejected() {
        let err = Registry::builder()
            .register(RecordDecl::new("Pet").field("owner", Field::reference("Ghost")))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownReferenceTarget { .. }));
    }

    #[test]
    fn test_reserved_and_invalid_names() {
        let err = Registry::builder()
            .register(RecordDecl::new("Person").field("saved", Field::boolean()))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::ReservedFieldName("saved".to_string()));

        let err = Registry::builder()
            .register(RecordDecl::new("drop;--"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(_)));

        assert!(validate_identifier("_private1").is_ok());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_duplicate_table_names_are_rejected() {
        let err = people()
            .register(RecordDecl::new("PERSON"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateRecordType("PERSON".to_string()));
    }

    #[test]
    fn test_unknown_record_type_lookup() {
        let registry = people().build().unwrap();
        assert_eq!(
            registry.fields_of("Ghost").unwrap_err(),
            QueryError::UnknownRecordType("Ghost".to_string())
        );
    }
}
