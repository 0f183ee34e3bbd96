//! Field descriptors: one column's type, constraints and default.
//!
//! A [`Field`] is pure metadata. It renders its SQL column definition
//! ([`Field::metadata`]) and validates candidate values
//! ([`Field::validate`]) without ever holding record data.
//!
//! Besides plain columns there are two special kinds (see [`FieldKind`]):
//! the implicit auto-increment primary key every record type carries, and
//! references to another record type's `id`.
//!
//! # Examples
//!
//! ```
//! use recordkit_core::{Field, Value};
//!
//! let age = Field::integer().with_default(1).unwrap();
//! assert_eq!(age.validate(Some(Value::from(10))).unwrap(), Value::from(10));
//! assert_eq!(age.validate(None).unwrap(), Value::from(1));
//!
//! let nickname = Field::text().nullable();
//! assert_eq!(nickname.validate(None).unwrap(), Value::Null);
//! assert_eq!(nickname.metadata(), vec!["TEXT"]);
//! ```

use crate::error::ValidationError;
use crate::query::quote_identifier;
use crate::value::{Value, ValueType};

/// Behavioral variant of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Ordinary column.
    Plain,
    /// Integer primary key filled in by the database.
    AutoPrimaryKey {
        /// Allows callers to assign the id by hand.
        allow_manual: bool,
    },
    /// Integer column holding the `id` of a row of `target`.
    Reference {
        /// Name of the referenced record type, resolved through the registry.
        target: String,
    },
}

/// Descriptor for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    kind: FieldKind,
    value_type: ValueType,
    default: Option<Value>,
    unique: bool,
    nullable: bool,
    blank: bool,
    primary_key: bool,
    auto_increment: bool,
    max_length: Option<u32>,
}

impl Field {
    /// Creates a required column of the given type.
    pub fn new(value_type: ValueType) -> Self {
        Self {
            kind: FieldKind::Plain,
            value_type,
            default: None,
            unique: false,
            nullable: false,
            blank: false,
            primary_key: false,
            auto_increment: false,
            max_length: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(ValueType::Integer)
    }

    pub fn text() -> Self {
        Self::new(ValueType::Text)
    }

    pub fn real() -> Self {
        Self::new(ValueType::Real)
    }

    pub fn boolean() -> Self {
        Self::new(ValueType::Boolean)
    }

    /// Creates the auto-increment integer primary key.
    ///
    /// Every record type receives one of these as its implicit `id` field.
    pub fn auto_primary_key() -> Self {
        Self {
            kind: FieldKind::AutoPrimaryKey {
                allow_manual: false,
            },
            primary_key: true,
            auto_increment: true,
            ..Self::integer()
        }
    }

    /// Creates a reference to the `id` of another record type.
    ///
    /// # Examples
    ///
    /// ```
    /// use recordkit_core::{Field, ValidationError, Value};
    ///
    /// let owner = Field::reference("Person");
    /// assert_eq!(owner.validate(Some(Value::from(3))).unwrap(), Value::from(3));
    /// assert_eq!(
    ///     owner.validate(Some(Value::from(-1))),
    ///     Err(ValidationError::InvalidForeignKey(-1))
    /// );
    /// assert_eq!(
    ///     owner.metadata(),
    ///     vec!["INT", "NOT NULL", "REFERENCES \"person\"(\"id\")"]
    /// );
    /// ```
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Reference {
                target: target.into(),
            },
            ..Self::integer()
        }
    }

    /// Sets the default used when no value is supplied.
    ///
    /// A `Null` default is the same as no default. A zero, empty or `false`
    /// default still counts as present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TypeMismatch`] if the default does not
    /// satisfy the field's value type, and
    /// [`ValidationError::NonFiniteDefault`] for a NaN or infinite real.
    pub fn with_default(mut self, default: impl Into<Value>) -> Result<Self, ValidationError> {
        let default = default.into();
        if default.is_null() {
            self.default = None;
            return Ok(self);
        }
        if !self.value_type.matches(&default) {
            return Err(self.mismatch(&default));
        }
        if let Value::Real(r) = default {
            if !r.is_finite() {
                return Err(ValidationError::NonFiniteDefault(r.to_string()));
            }
        }
        self.default = Some(default);
        Ok(self)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Allows the field to be left empty, like [`nullable`](Self::nullable).
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Caps a text column, rendering it as `VARCHAR(n)`.
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Lets callers assign an auto-increment primary key by hand.
    ///
    /// Has no effect on other kinds of field.
    pub fn allow_manual(mut self) -> Self {
        if let FieldKind::AutoPrimaryKey { allow_manual } = &mut self.kind {
            *allow_manual = true;
        }
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable && !self.primary_key
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn max_len(&self) -> Option<u32> {
        self.max_length
    }

    /// Target record type of a reference field.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { target } => Some(target),
            _ => None,
        }
    }

    /// SQL column type token.
    pub fn sql_type(&self) -> String {
        match self.value_type {
            ValueType::Integer if self.primary_key => "INTEGER".to_string(),
            ValueType::Integer => "INT".to_string(),
            ValueType::Text => match self.max_length {
                Some(n) => format!("VARCHAR({n})"),
                None => "TEXT".to_string(),
            },
            ValueType::Real => "FLOAT".to_string(),
            ValueType::Boolean => "BOOLEAN".to_string(),
        }
    }

    /// SQL constraint tokens, in declaration order.
    ///
    /// Primary keys are always `NOT NULL`. `AUTOINCREMENT` directly follows
    /// `PRIMARY KEY` when both are set, since SQLite accepts it nowhere else.
    /// The blank marker is emitted as a comment so the column definition
    /// stays valid SQL.
    pub fn constraints(&self) -> Vec<String> {
        let mut constraints = Vec::new();
        if self.primary_key {
            constraints.push("PRIMARY KEY".to_string());
            if self.auto_increment {
                constraints.push("AUTOINCREMENT".to_string());
            }
        }
        if self.primary_key || !(self.nullable || self.blank) {
            constraints.push("NOT NULL".to_string());
        }
        if self.blank {
            constraints.push("/* BLANK */".to_string());
        }
        if self.unique {
            constraints.push("UNIQUE".to_string());
        }
        if self.auto_increment && !self.primary_key {
            constraints.push("AUTOINCREMENT".to_string());
        }
        if let Some(default) = &self.default {
            constraints.push(format!("DEFAULT {}", default.sql_literal()));
        }
        constraints
    }

    /// Full column definition: the type followed by its constraints.
    pub fn metadata(&self) -> Vec<String> {
        match &self.kind {
            FieldKind::AutoPrimaryKey { .. } => vec![
                "INTEGER".to_string(),
                "PRIMARY KEY".to_string(),
                "AUTOINCREMENT".to_string(),
            ],
            FieldKind::Reference { target } => {
                let mut meta = vec![self.sql_type()];
                if !self.nullable {
                    meta.push("NOT NULL".to_string());
                }
                meta.push(format!(
                    "REFERENCES {}({})",
                    quote_identifier(&target.to_lowercase()),
                    quote_identifier("id")
                ));
                meta
            }
            FieldKind::Plain => {
                let mut meta = vec![self.sql_type()];
                meta.extend(self.constraints());
                meta
            }
        }
    }

    /// Validates a candidate value and returns the value to store.
    ///
    /// `None` and `Some(Value::Null)` both mean "no value". A missing value
    /// resolves to the default, then to `Null` for nullable or blank fields.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingValue`] if nothing can fill a required field.
    /// - [`ValidationError::TypeMismatch`] for a value of the wrong type.
    /// - [`ValidationError::ManualAutoIncrement`] for a hand-assigned
    ///   auto-increment id.
    /// - [`ValidationError::InvalidForeignKey`] / [`ValidationError::MissingId`]
    ///   for unusable references.
    pub fn validate(&self, value: Option<Value>) -> Result<Value, ValidationError> {
        let value = value.filter(|v| !v.is_null());
        match &self.kind {
            FieldKind::AutoPrimaryKey { allow_manual } => match value {
                None => Ok(Value::Null),
                Some(Value::Integer(id)) if *allow_manual => Ok(Value::Integer(id)),
                Some(Value::Integer(_)) => Err(ValidationError::ManualAutoIncrement),
                Some(other) => Err(self.mismatch(&other)),
            },
            FieldKind::Reference { target } => match value {
                None => self.absent(),
                Some(Value::Record(record)) if record.record_type().is_a(target) => record
                    .id()
                    .map(Value::Integer)
                    .ok_or_else(|| ValidationError::MissingId {
                        target: target.clone(),
                    }),
                Some(Value::Integer(id)) if id <= 0 => Err(ValidationError::InvalidForeignKey(id)),
                Some(Value::Integer(id)) => Ok(Value::Integer(id)),
                Some(other) => Err(ValidationError::TypeMismatch {
                    expected: format!("{target} record or integer id"),
                    found: other.type_name(),
                }),
            },
            FieldKind::Plain => match value {
                None => self.absent(),
                Some(v) if self.value_type.matches(&v) => Ok(v),
                Some(other) => Err(self.mismatch(&other)),
            },
        }
    }

    /// Coerces a value read back from storage to the declared type.
    ///
    /// SQLite hands booleans back as integers and may return whole reals as
    /// integers; everything else passes through unchanged.
    pub fn decode(&self, stored: Value) -> Value {
        match (self.value_type, stored) {
            (ValueType::Boolean, Value::Integer(i)) => Value::Boolean(i != 0),
            (ValueType::Real, Value::Integer(i)) => Value::Real(i as f64),
            (_, other) => other,
        }
    }

    fn absent(&self) -> Result<Value, ValidationError> {
        if let Some(default) = &self.default {
            return Ok(default.clone());
        }
        if self.is_nullable() || self.blank {
            return Ok(Value::Null);
        }
        Err(ValidationError::MissingValue)
    }

    fn mismatch(&self, found: &Value) -> ValidationError {
        ValidationError::TypeMismatch {
            expected: self.value_type.to_string(),
            found: found.type_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fields_success() {
        let integer_field = Field::integer().with_default(1).unwrap();
        let char_field = Field::text().nullable();
        assert_eq!(
            integer_field.validate(Some(Value::from(10))).unwrap(),
            Value::from(10)
        );
        assert_eq!(integer_field.validate(None).unwrap(), Value::from(1));
        assert_eq!(
            char_field.validate(Some(Value::from("Carlos"))).unwrap(),
            Value::from("Carlos")
        );
        assert_eq!(char_field.validate(None).unwrap(), Value::Null);
    }

    #[test]
    fn test_fields_failed() {
        assert_eq!(
            Field::integer().validate(None),
            Err(ValidationError::MissingValue)
        );
        assert_eq!(
            Field::text().validate(Some(Value::Null)),
            Err(ValidationError::MissingValue)
        );
    }

    #[test]
    fn test_falsy_default_counts_as_present() {
        let zero = Field::integer().with_default(0).unwrap();
        assert_eq!(zero.validate(None).unwrap(), Value::from(0));
        let empty = Field::text().with_default("").unwrap();
        assert_eq!(empty.validate(None).unwrap(), Value::from(""));
        assert_eq!(empty.metadata(), vec!["TEXT", "NOT NULL", "DEFAULT ''"]);
    }

    #[test]
    fn test_default_must_match_type() {
        assert_eq!(
            Field::integer().with_default("one"),
            Err(ValidationError::TypeMismatch {
                expected: "integer".to_string(),
                found: "text".to_string(),
            })
        );
    }

    #[test]
    fn test_non_finite_real_default_is_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                Field::real().with_default(bad),
                Err(ValidationError::NonFiniteDefault(_))
            ));
        }
        let weight = Field::real().with_default(2.5).unwrap();
        assert_eq!(weight.metadata(), vec!["FLOAT", "NOT NULL", "DEFAULT 2.5"]);
    }

    #[test]
    fn test_blank_field_accepts_absence() {
        let bio = Field::text().blank();
        assert_eq!(bio.validate(None).unwrap(), Value::Null);
        assert_eq!(bio.metadata(), vec!["TEXT", "/* BLANK */"]);
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(Field::integer().sql_type(), "INT");
        assert_eq!(Field::integer().primary_key().sql_type(), "INTEGER");
        assert_eq!(Field::text().sql_type(), "TEXT");
        assert_eq!(Field::text().max_length(50).sql_type(), "VARCHAR(50)");
        assert_eq!(Field::real().sql_type(), "FLOAT");
        assert_eq!(Field::boolean().sql_type(), "BOOLEAN");
    }

    #[test]
    fn test_constraints_order() {
        let field = Field::text()
            .max_length(20)
            .unique()
            .with_default("guest")
            .unwrap();
        assert_eq!(
            field.metadata(),
            vec!["VARCHAR(20)", "NOT NULL", "UNIQUE", "DEFAULT 'guest'"]
        );
    }

    #[test]
    fn test_primary_key_is_always_not_null() {
        let code = Field::text().primary_key().nullable();
        assert_eq!(code.constraints(), vec!["PRIMARY KEY", "NOT NULL"]);
        assert!(!code.is_nullable());
        // Rendering twice yields the same tokens.
        assert_eq!(code.constraints(), code.constraints());
        assert_eq!(code.validate(None), Err(ValidationError::MissingValue));
    }

    #[test]
    fn test_plain_primary_key_autoincrement_is_adjacent() {
        let field = Field::integer().primary_key().auto_increment();
        assert_eq!(
            field.metadata(),
            vec!["INTEGER", "PRIMARY KEY", "AUTOINCREMENT", "NOT NULL"]
        );
    }

    #[test]
    fn test_auto_primary_key_rules() {
        let id = Field::auto_primary_key();
        assert_eq!(id.validate(None).unwrap(), Value::Null);
        assert_eq!(
            id.validate(Some(Value::from(5))),
            Err(ValidationError::ManualAutoIncrement)
        );
        assert!(matches!(
            id.validate(Some(Value::from("x"))),
            Err(ValidationError::TypeMismatch { .. })
        ));

        let manual = Field::auto_primary_key().allow_manual();
        assert_eq!(manual.validate(Some(Value::from(5))).unwrap(), Value::from(5));
        assert!(matches!(
            manual.validate(Some(Value::from("x"))),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert_eq!(
            manual.metadata(),
            vec!["INTEGER", "PRIMARY KEY", "AUTOINCREMENT"]
        );
    }

    #[test]
    fn test_reference_rules() {
        let owner = Field::reference("Person");
        assert_eq!(
            owner.validate(Some(Value::from(-1))),
            Err(ValidationError::InvalidForeignKey(-1))
        );
        assert_eq!(
            owner.validate(Some(Value::from(0))),
            Err(ValidationError::InvalidForeignKey(0))
        );
        assert_eq!(owner.validate(Some(Value::from(3))).unwrap(), Value::from(3));
        assert!(matches!(
            owner.validate(Some(Value::from("3"))),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert_eq!(owner.validate(None), Err(ValidationError::MissingValue));
        assert_eq!(
            Field::reference("Person").nullable().validate(None).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_nullable_reference_metadata() {
        assert_eq!(
            Field::reference("Person").nullable().metadata(),
            vec!["INT", "REFERENCES \"person\"(\"id\")"]
        );
    }

    #[test]
    fn test_decode_restores_declared_types() {
        assert_eq!(Field::boolean().decode(Value::from(1)), Value::from(true));
        assert_eq!(Field::boolean().decode(Value::from(0)), Value::from(false));
        assert_eq!(Field::real().decode(Value::from(2)), Value::from(2.0));
        assert_eq!(Field::integer().decode(Value::from(2)), Value::from(2));
        assert_eq!(Field::boolean().decode(Value::Null), Value::Null);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::Integer),
            any::<bool>().prop_map(Value::Boolean),
            (-1.0e9f64..1.0e9).prop_map(Value::Real),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::Text),
        ]
    }

    fn arb_value_type() -> impl Strategy<Value = ValueType> {
        prop_oneof![
            Just(ValueType::Integer),
            Just(ValueType::Text),
            Just(ValueType::Real),
            Just(ValueType::Boolean),
        ]
    }

    proptest! {
        #[test]
        fn validate_returns_value_unchanged_iff_type_matches(
            value_type in arb_value_type(),
            value in arb_value(),
        ) {
            let field = Field::new(value_type);
            let result = field.validate(Some(value.clone()));
            if value_type.matches(&value) {
                prop_assert_eq!(result, Ok(value));
            } else {
                let is_mismatch = matches!(result, Err(ValidationError::TypeMismatch { .. }));
                prop_assert!(is_mismatch);
            }
        }

        #[test]
        fn absent_value_yields_default(value in arb_value()) {
            let value_type = match &value {
                Value::Integer(_) => ValueType::Integer,
                Value::Boolean(_) => ValueType::Boolean,
                Value::Real(_) => ValueType::Real,
                _ => ValueType::Text,
            };
            let field = Field::new(value_type).with_default(value.clone()).unwrap();
            prop_assert_eq!(field.validate(None), Ok(value));
        }

        #[test]
        fn absent_required_value_fails(value_type in arb_value_type()) {
            prop_assert_eq!(
                Field::new(value_type).validate(None),
                Err(ValidationError::MissingValue)
            );
        }
    }
}
