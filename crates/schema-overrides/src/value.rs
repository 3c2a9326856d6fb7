use std::collections::BTreeMap;

use serde::Serialize;
use strum::Display;

use crate::{
    bag::AttributeBag,
    overrides::Override,
    validation::{Validate, ValidatingBag},
};

/// A value stored in a field of an [`AttributeBag`].
///
/// Scalars are leaves. Sequences and mappings may contain further bags and overrides, which is
/// how override trees of arbitrary depth are represented.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// The field is present, but holds no value. This is not the same as the field being absent.
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
    Bag(ValidatingBag),
    Override(Override),
}

/// The shape of a [`Value`], used when reporting type mismatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Sequence,
    Mapping,
    Bag,
    Override,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Mapping(_) => ValueKind::Mapping,
            Self::Bag(_) => ValueKind::Bag,
            Self::Override(_) => ValueKind::Override,
        }
    }

    /// Returns the validation capability of this value, if it has one.
    ///
    /// Scalars have nothing to validate and return [`None`]. Containers return themselves, since
    /// validating them means validating whatever they contain.
    pub fn as_validate(&self) -> Option<&dyn Validate> {
        match self {
            Self::Sequence(values) => Some(values),
            Self::Mapping(values) => Some(values),
            Self::Bag(bag) => Some(bag),
            Self::Override(over) => Some(over),
            Self::Null | Self::Bool(_) | Self::Integer(_) | Self::Float(_) | Self::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Renders a scalar as it should appear when spliced into a string.
    ///
    /// `Null` renders as the empty string, non-scalars return [`None`].
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Sequence(values)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Mapping(entries)
    }
}

impl From<AttributeBag> for Value {
    fn from(bag: AttributeBag) -> Self {
        Self::Bag(bag.into())
    }
}

impl From<ValidatingBag> for Value {
    fn from(bag: ValidatingBag) -> Self {
        Self::Bag(bag)
    }
}

impl From<Override> for Value {
    fn from(over: Override) -> Self {
        Self::Override(over)
    }
}

impl<K, V> FromIterator<(K, V)> for Value
where
    K: Into<String>,
    V: Into<Value>,
{
    /// Collects into a [`Value::Mapping`].
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Mapping(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
