//! Serializable record type declarations.
//!
//! Project files describe their models as data rather than code. A
//! [`ModelDecl`] converts into a [`RecordDecl`], and a list of them into a
//! built [`Registry`].
//!
//! ```
//! use recordkit_core::{ModelDecl, Registry};
//!
//! let models: Vec<ModelDecl> = serde_json::from_str(r#"[
//!     { "name": "Person", "fields": [
//!         { "name": "name", "type": "str" },
//!         { "name": "age", "type": "int", "default": 0 }
//!     ]},
//!     { "name": "Pet", "fields": [
//!         { "name": "owner", "references": "Person", "null": true }
//!     ]}
//! ]"#).unwrap();
//!
//! let registry = Registry::from_models(&models).unwrap();
//! assert_eq!(registry.fields_of("Person").unwrap().len(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, Result, SchemaError};
use crate::field::Field;
use crate::registry::{RecordDecl, Registry};
use crate::value::{Value, ValueType};

/// One record type as written in a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDecl {
    pub name: String,
    /// Parent record type; the base record when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// One field as written in a project file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    /// Value type name, e.g. `int`, `text`, `bool`. Not needed for
    /// references or the auto primary key.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, alias = "null")]
    pub nullable: bool,
    #[serde(default)]
    pub blank: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Target record type of a reference field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    /// Declares the auto-increment integer primary key.
    #[serde(default)]
    pub auto: bool,
    /// With `auto`, lets callers assign the key by hand.
    #[serde(default)]
    pub allow_manual: bool,
}

impl FieldDecl {
    /// Builds the field descriptor.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::MissingType`] for a plain field without `type`.
    /// - [`SchemaError::UnsupportedType`] for an unknown type name.
    /// - [`SchemaError::UnsupportedDefault`] for a non-scalar default.
    /// - A validation error if the default does not match the type.
    pub fn to_field(&self, model: &str) -> Result<Field> {
        let mut field = if self.auto {
            let field = Field::auto_primary_key();
            if self.allow_manual {
                field.allow_manual()
            } else {
                field
            }
        } else if let Some(target) = &self.references {
            Field::reference(target.clone())
        } else {
            let value_type: ValueType = self
                .value_type
                .as_deref()
                .ok_or_else(|| SchemaError::MissingType(format!("{model}.{}", self.name)))?
                .parse()?;
            Field::new(value_type)
        };

        if self.unique {
            field = field.unique();
        }
        if self.nullable {
            field = field.nullable();
        }
        if self.blank {
            field = field.blank();
        }
        if self.primary_key {
            field = field.primary_key();
        }
        if self.auto_increment {
            field = field.auto_increment();
        }
        if let Some(max_length) = self.max_length {
            field = field.max_length(max_length);
        }

        if let Some(default) = &self.default {
            let value = Value::from_json(default)
                .ok_or_else(|| SchemaError::UnsupportedDefault(format!("{model}.{}", self.name)))?;
            let value = field.decode(value);
            field = field
                .with_default(value)
                .map_err(|err| OrmError::field(model, &self.name, err))?;
        }
        Ok(field)
    }
}

impl ModelDecl {
    /// Converts the model into a registrable declaration.
    pub fn to_record_decl(&self) -> Result<RecordDecl> {
        let mut decl = RecordDecl::new(&self.name);
        if let Some(parent) = &self.extends {
            decl = decl.extends(parent);
        }
        for field in &self.fields {
            decl = decl.field(&field.name, field.to_field(&self.name)?);
        }
        Ok(decl)
    }
}

impl Registry {
    /// Builds a registry from project file models, in order.
    pub fn from_models(models: &[ModelDecl]) -> Result<Self> {
        let mut builder = Registry::builder();
        for model in models {
            builder = builder.register(model.to_record_decl()?);
        }
        Ok(builder.build()?)
    }
}
