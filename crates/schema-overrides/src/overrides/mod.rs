//! Overrides are [validating bags](`ValidatingBag`) that only make sense for one kind of base
//! node.
//!
//! Which fields an override may carry is declared once per kind by a static [`OverrideKind`]. The
//! core ships with [`RESOURCE`] and [`PROPERTY`]. Providers that need additional fields declare
//! their own kinds and construct overrides with [`ResourceOverride::with_kind`] and
//! [`PropertyOverride::with_kind`]:
//!
//! ```
//! use schema_overrides::{FieldKind, FieldSpec, OverrideKind, ResourceOverride, overrides::PROPERTY};
//!
//! static TERRAFORM_RESOURCE: OverrideKind = OverrideKind {
//!     name: "terraform resource",
//!     fields: &[
//!         FieldSpec::new("description", FieldKind::String),
//!         FieldSpec::new("properties", FieldKind::Overrides(&PROPERTY)),
//!         FieldSpec::new("import_format", FieldKind::Sequence),
//!     ],
//! };
//!
//! let over = ResourceOverride::with_kind(&TERRAFORM_RESOURCE);
//! assert!(over.kind().recognizes("import_format"));
//! ```
//!
//! Construction accepts any field name. Unrecognized names are rejected when the override is
//! [validated](`Validate`), together with values whose shape does not match their [`FieldSpec`].
use std::fmt::Display;

use delegate::delegate;
use serde::Serialize;

use crate::{
    bag::AttributeBag,
    validation::{Validate, ValidatingBag, ValidationError, Validator},
    value::Value,
};

mod property;
mod resource;

pub use property::PropertyOverride;
pub use resource::{ResourceOverride, ResourceOverrides};

/// Fields recognized by overrides of a whole resource.
pub static RESOURCE: OverrideKind = OverrideKind {
    name: "resource",
    fields: &[
        FieldSpec::new("description", FieldKind::String),
        FieldSpec::new("exclude", FieldKind::Bool),
        FieldSpec::new("parameters", FieldKind::Overrides(&PROPERTY)),
        FieldSpec::new("properties", FieldKind::Overrides(&PROPERTY)),
    ],
};

/// Fields recognized by overrides of a single property.
pub static PROPERTY: OverrideKind = OverrideKind {
    name: "property",
    fields: &[
        FieldSpec::new("description", FieldKind::String),
        FieldSpec::new("exclude", FieldKind::Bool),
        FieldSpec::new("required", FieldKind::Bool),
        FieldSpec::new("default_value", FieldKind::Any),
    ],
};

/// Describes one kind of override: its name and the fields it recognizes.
///
/// Kinds are compared by name.
#[derive(Debug)]
pub struct OverrideKind {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl OverrideKind {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        let name = crate::bag::field_name(name);
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn recognizes(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

impl PartialEq for OverrideKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for OverrideKind {}

/// A field recognized by an [`OverrideKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// The shape a recognized field's value must have.
///
/// [`Value::Null`] is accepted for every kind, since it only states that the field is present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    String,
    Bool,
    Integer,
    Sequence,
    Mapping,

    /// A mapping from target name (or dotted path) to overrides of the given kind.
    Overrides(&'static OverrideKind),
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("any value"),
            Self::String => f.write_str("a string"),
            Self::Bool => f.write_str("a bool"),
            Self::Integer => f.write_str("an integer"),
            Self::Sequence => f.write_str("a sequence"),
            Self::Mapping => f.write_str("a mapping"),
            Self::Overrides(kind) => write!(f, "a mapping of {} overrides", kind.name),
        }
    }
}

impl FieldKind {
    /// Checks the shape of `value`. Nested overrides are only checked for their kind here, their
    /// contents are validated by the bag traversal.
    fn check(self, value: &Value, validator: Validator<'_>) -> Result<(), ValidationError> {
        match (self, value) {
            (_, Value::Null)
            | (Self::Any, _)
            | (Self::String, Value::String(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Integer, Value::Integer(_))
            | (Self::Sequence, Value::Sequence(_))
            | (Self::Mapping, Value::Mapping(_) | Value::Bag(_)) => Ok(()),
            (Self::Overrides(expected), Value::Mapping(entries)) => {
                for (target, entry) in entries {
                    let validator = validator.field(target);
                    match entry {
                        Value::Null => {}
                        Value::Override(over) if over.kind() == expected => {}
                        Value::Override(over) => {
                            return Err(
                                validator.error_unexpected_kind(expected.name, over.kind().name)
                            );
                        }
                        other => {
                            return Err(validator.error_unexpected_type(self, other.kind()));
                        }
                    }
                }
                Ok(())
            }
            (expected, found) => Err(validator.error_unexpected_type(expected, found.kind())),
        }
    }
}

/// An override of some [`OverrideKind`], without a merge strategy attached.
///
/// This is the form in which overrides are nested inside other overrides (see [`Value::Override`]).
/// [`ResourceOverride`] and [`PropertyOverride`] wrap it to make it [applicable](`crate::Apply`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Override {
    #[serde(skip)]
    kind: &'static OverrideKind,
    bag: ValidatingBag,
}

impl Override {
    pub fn new(kind: &'static OverrideKind) -> Self {
        Self {
            kind,
            bag: ValidatingBag::new(),
        }
    }

    /// Builds an override from ready-made `(name, value)` pairs. No field filtering happens here.
    pub fn from_map<K, V>(kind: &'static OverrideKind, map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            kind,
            bag: ValidatingBag::from_map(map),
        }
    }

    pub fn kind(&self) -> &'static OverrideKind {
        self.kind
    }

    pub fn as_bag(&self) -> &ValidatingBag {
        &self.bag
    }

    /// Iterates over the nested overrides stored in the mapping field `name`.
    ///
    /// Entries that are not overrides are skipped, [validation](`Validate`) reports them.
    pub fn nested(&self, name: &str) -> impl Iterator<Item = (&str, &Override)> {
        let entries = match self.bag.get(name) {
            Some(Value::Mapping(entries)) => Some(entries),
            _ => None,
        };
        entries
            .into_iter()
            .flatten()
            .filter_map(|(target, entry)| match entry {
                Value::Override(over) => Some((target.as_str(), over)),
                _ => None,
            })
    }

    delegate! {
        to self.bag {
            /// Returns the value of the field `name`, which may be given with or without its `@` prefix.
            pub fn get(&self, name: &str) -> Option<&Value>;

            pub fn contains(&self, name: &str) -> bool;

            /// Sets the field `name`, returning the value it previously held.
            pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value>;

            /// Returns `true` if no field has been set at all.
            pub fn is_empty(&self) -> bool;

            pub fn len(&self) -> usize;

            pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)>;
        }
    }
}

impl Validate for Override {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        for (name, value) in self.bag.iter() {
            let validator = validator.field(&name);
            let Some(spec) = self.kind.field(name) else {
                return Err(validator.error_unrecognized(self.kind.name));
            };
            spec.kind.check(value, validator)?;
        }
        self.bag.validate_with(validator)
    }
}

impl AsRef<Self> for Override {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl AsRef<AttributeBag> for Override {
    fn as_ref(&self) -> &AttributeBag {
        self.bag.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::validation::ValidationProblem;

    #[rstest]
    #[case::string("description", Value::from("text"))]
    #[case::null_string("description", Value::Null)]
    #[case::bool("exclude", Value::from(true))]
    #[case::any_int("default_value", Value::from(3))]
    #[case::any_seq("default_value", Value::Sequence(vec!["a".into()]))]
    #[case::prefixed("@required", Value::from(false))]
    fn accepts_recognized_fields(#[case] name: &str, #[case] value: Value) {
        let over = Override::from_map(&PROPERTY, [(name, value)]);
        assert_eq!(over.validate(), Ok(()));
    }

    #[rstest]
    #[case("description", Value::from(1), FieldKind::String, crate::ValueKind::Integer)]
    #[case("exclude", Value::from("yes"), FieldKind::Bool, crate::ValueKind::String)]
    #[case("required", Value::Sequence(vec![]), FieldKind::Bool, crate::ValueKind::Sequence)]
    fn rejects_mistyped_fields(
        #[case] name: &str,
        #[case] value: Value,
        #[case] expected: FieldKind,
        #[case] found: crate::ValueKind,
    ) {
        let over = Override::from_map(&PROPERTY, [(name, value)]);
        let err = over.validate().unwrap_err();
        assert_eq!(err.path(), name);
        assert_eq!(
            err.problem(),
            &ValidationProblem::UnexpectedType { expected, found }
        );
    }

    #[test]
    fn construction_keeps_unrecognized_fields_but_validation_rejects_them() {
        let over = Override::from_map(&RESOURCE, [("description", "ok"), ("color", "blue")]);
        assert_eq!(over.get("color"), Some(&Value::from("blue")));

        let err = over.validate().unwrap_err();
        assert_eq!(err.path(), "color");
        assert_eq!(
            err.problem(),
            &ValidationProblem::UnrecognizedField { kind: "resource" }
        );
    }

    #[test]
    fn nested_overrides_must_match_the_declared_kind() {
        let wrong_kind = Override::from_map(&RESOURCE, [("description", "nested resource")]);
        let over = Override::from_map(
            &RESOURCE,
            [(
                "properties",
                [("someProperty", wrong_kind)].into_iter().collect::<Value>(),
            )],
        );

        let err = over.validate().unwrap_err();
        assert_eq!(err.path(), "properties.someProperty");
        assert_eq!(
            err.problem(),
            &ValidationProblem::UnexpectedOverrideKind {
                expected: "property",
                found: "resource",
            }
        );
    }

    #[test]
    fn nested_override_contents_are_validated() {
        let nested = Override::from_map(&PROPERTY, [("required", Value::from("yes"))]);
        let over = Override::from_map(
            &RESOURCE,
            [(
                "properties",
                [("anotherProperty.someNestedProperty", nested)]
                    .into_iter()
                    .collect::<Value>(),
            )],
        );

        let err = over.validate().unwrap_err();
        assert_eq!(
            err.path(),
            "properties.anotherProperty.someNestedProperty.required"
        );
    }

    #[test]
    fn nested_lists_only_overrides() {
        let over = Override::from_map(
            &RESOURCE,
            [(
                "properties",
                [
                    ("a", Value::from(Override::new(&PROPERTY))),
                    ("b", Value::from("not an override")),
                ]
                .into_iter()
                .collect::<Value>(),
            )],
        );

        let targets: Vec<_> = over.nested("properties").map(|(target, _)| target).collect();
        assert_eq!(targets, ["a"]);
        assert_eq!(over.nested("parameters").count(), 0);
    }

    #[test]
    fn kinds_describe_their_fields() {
        assert!(RESOURCE.recognizes("@description"));
        assert!(!RESOURCE.recognizes("required"));
        assert_eq!(
            RESOURCE.field("properties").map(|spec| spec.kind),
            Some(FieldKind::Overrides(&PROPERTY))
        );
        assert_eq!(
            FieldKind::Overrides(&PROPERTY).to_string(),
            "a mapping of property overrides"
        );
    }
}
