//! Recursive validation of override trees.
//!
//! Every node that can be checked implements [`Validate`]. Containers ([`ValidatingBag`], sequences
//! and mappings of [`Value`]s) do not check anything themselves: they only hand each of their values
//! that is [validatable](`Value::as_validate`) its own [`Validator`], so that failures deep inside the
//! tree are reported with the full path to the offending field.
use std::{
    collections::BTreeMap,
    fmt::{Display, Write},
};

use delegate::delegate;
use serde::Serialize;
use snafu::Snafu;

use crate::{bag::AttributeBag, overrides::FieldKind, value::{Value, ValueKind}};

/// Contains context used for generating validation errors.
///
/// A root `Validator` is created by [`Validate::validate`]. Nested nodes receive one that is
/// scoped to their field via [`Validator::field`].
#[derive(Clone, Copy)]
pub struct Validator<'a> {
    ident: Option<&'a dyn Display>,
    parent: Option<&'a Validator<'a>>,
}

impl<'a> Validator<'a> {
    pub fn root() -> Self {
        Self {
            ident: None,
            parent: None,
        }
    }

    /// Creates a `Validator` for a subfield of the current object
    pub fn field<'b>(&'b self, ident: &'b dyn Display) -> Validator<'b> {
        Validator {
            ident: Some(ident),
            parent: Some(self),
        }
    }

    fn error_problem(self, problem: ValidationProblem) -> ValidationError {
        let mut idents = Vec::new();
        let mut curr = Some(&self);
        while let Some(curr_some) = curr {
            if let Some(ident) = curr_some.ident {
                idents.push(ident.to_string());
            }
            curr = curr_some.parent;
        }
        ValidationError {
            path: FieldPath { idents },
            problem,
        }
    }

    /// Returns an error indicating that the field is not among the recognized fields of `kind`
    pub fn error_unrecognized(self, kind: &'static str) -> ValidationError {
        self.error_problem(UnrecognizedFieldSnafu { kind }.build())
    }

    /// Returns an error indicating that the field holds a value of the wrong shape
    pub fn error_unexpected_type(self, expected: FieldKind, found: ValueKind) -> ValidationError {
        self.error_problem(UnexpectedTypeSnafu { expected, found }.build())
    }

    /// Returns an error indicating that the field holds an override of the wrong kind
    pub fn error_unexpected_kind(
        self,
        expected: &'static str,
        found: &'static str,
    ) -> ValidationError {
        self.error_problem(UnexpectedOverrideKindSnafu { expected, found }.build())
    }
}

#[derive(Debug, PartialEq, Eq)]
struct FieldPath {
    idents: Vec<String>,
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.idents.is_empty() {
            return f.write_str("<root>");
        }
        for (i, ident) in self.idents.iter().rev().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            f.write_str(ident)?;
        }
        Ok(())
    }
}

/// An error that occurred when validating an override tree.
///
/// It is constructed by calling one of the `error_*` methods on [`Validator`].
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display("failed to validate {path}"))]
pub struct ValidationError {
    path: FieldPath,
    #[snafu(source)]
    problem: ValidationProblem,
}

impl ValidationError {
    /// The dotted path from the validated root to the offending field.
    pub fn path(&self) -> String {
        self.path.to_string()
    }

    pub fn problem(&self) -> &ValidationProblem {
        &self.problem
    }
}

/// A problem that was discovered during validation, with no additional context.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ValidationProblem {
    #[snafu(display("field is not recognized by {kind} overrides"))]
    UnrecognizedField { kind: &'static str },

    #[snafu(display("expected {expected}, found {found}"))]
    UnexpectedType {
        expected: FieldKind,
        found: ValueKind,
    },

    #[snafu(display("expected a {expected} override, found a {found} override"))]
    UnexpectedOverrideKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// A node of an override tree that knows how to check itself.
pub trait Validate {
    /// Validates `self`, reporting failures relative to `validator`.
    ///
    /// Implementations that contain further nodes must pass each of them a
    /// [field-scoped](`Validator::field`) validator.
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError>;

    /// Validates `self` as the root of a tree.
    fn validate(&self) -> Result<(), ValidationError> {
        self.validate_with(Validator::root())
    }
}

impl Validate for Vec<Value> {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        for (index, value) in self.iter().enumerate() {
            if let Some(nested) = value.as_validate() {
                nested.validate_with(validator.field(&index))?;
            }
        }
        Ok(())
    }
}

impl Validate for BTreeMap<String, Value> {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        for (key, value) in self {
            if let Some(nested) = value.as_validate() {
                nested.validate_with(validator.field(key))?;
            }
        }
        Ok(())
    }
}

/// An [`AttributeBag`] that validates each of its field values that is itself validatable.
///
/// It checks nothing on its own: scalar fields are skipped, and any failure comes from a nested
/// value's own [`Validate`] implementation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatingBag(AttributeBag);

impl ValidatingBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<K, V>(map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self(AttributeBag::from_map(map))
    }

    pub fn into_inner(self) -> AttributeBag {
        self.0
    }

    delegate! {
        to self.0 {
            /// Returns the value of the field `name`, which may be given with or without its `@` prefix.
            pub fn get(&self, name: &str) -> Option<&Value>;

            pub fn contains(&self, name: &str) -> bool;

            /// Sets the field `name`, returning the value it previously held.
            pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value>;

            /// Returns `true` if no field has been set at all.
            pub fn is_empty(&self) -> bool;

            pub fn len(&self) -> usize;

            pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)>;

            pub fn names(&self) -> impl Iterator<Item = &str>;
        }
    }
}

impl Validate for ValidatingBag {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        for (name, value) in self.iter() {
            match value.as_validate() {
                Some(nested) => {
                    tracing::trace!(field = name, "validating nested value");
                    nested.validate_with(validator.field(&name))?;
                }
                None => tracing::trace!(field = name, "skipping scalar value"),
            }
        }
        Ok(())
    }
}

impl AsRef<AttributeBag> for ValidatingBag {
    fn as_ref(&self) -> &AttributeBag {
        &self.0
    }
}

impl From<AttributeBag> for ValidatingBag {
    fn from(bag: AttributeBag) -> Self {
        Self(bag)
    }
}

impl<K, V> FromIterator<(K, V)> for ValidatingBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
