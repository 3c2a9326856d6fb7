//! Applying overrides to base nodes.
//!
//! An override never decides on its own how it is merged. Instead, each override variant carries a
//! [`Strategy`], and [`Apply::apply`] forwards to it. Two strategies are provided:
//!
//! - [`Identity`] (the default) hands back the override itself, regardless of the base node. It is
//!   what you get when a provider has no merge logic of its own.
//! - [`MergeFields`] copies every overridden field into a clone of the base node. String values may
//!   refer to the base node's original values through `{{field}}` placeholders.
use std::sync::LazyLock;

use regex::Regex;
use snafu::{OptionExt, Snafu};

use crate::{
    bag::AttributeBag,
    overrides::{FieldKind, Override},
    value::{Value, ValueKind},
};

/// Matches `{{field}}`, `{{@field}}` and `{{ field }}`.
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*@?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
        .expect("failed to compile placeholder regex")
});

#[derive(Debug, Snafu)]
pub enum ApplyError {
    #[snafu(display(
        "placeholder {{{{{placeholder}}}}} in field {field:?} refers to a field the base node does not have"
    ))]
    UnresolvedPlaceholder { field: String, placeholder: String },

    #[snafu(display(
        "placeholder {{{{{placeholder}}}}} in field {field:?} refers to a {found} value, which cannot be spliced into a string"
    ))]
    NonScalarPlaceholder {
        field: String,
        placeholder: String,
        found: ValueKind,
    },

    #[snafu(display("base node rejected overridden field {field:?}"))]
    SubstituteField {
        field: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Something an override can be applied to.
///
/// This is implemented by the generator's base schema nodes. [`AttributeBag`] implements it too,
/// so bags can serve as base nodes.
pub trait Overridable: Clone {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the original value of `field`, if the node has one.
    fn original(&self, field: &str) -> Option<Value>;

    /// Replaces the value of `field`.
    fn substitute(&mut self, field: &str, value: Value) -> Result<(), Self::Error>;
}

impl Overridable for AttributeBag {
    type Error = std::convert::Infallible;

    fn original(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }

    fn substitute(&mut self, field: &str, value: Value) -> Result<(), Self::Error> {
        self.insert(field, value);
        Ok(())
    }
}

/// Turns an override and a base node into the effective node.
pub trait Apply<B: ?Sized> {
    type Output<'a>
    where
        Self: 'a;

    fn apply<'a>(&'a self, base: &B) -> Result<Self::Output<'a>, ApplyError>;
}

/// A policy for merging overrides of type `O` into base nodes of type `B`.
pub trait Strategy<O: ?Sized, B: ?Sized> {
    type Output<'o>
    where
        O: 'o;

    fn apply<'o>(&self, over: &'o O, base: &B) -> Result<Self::Output<'o>, ApplyError>;
}

/// Returns the override itself, ignoring the base node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Identity;

impl<O: ?Sized, B: ?Sized> Strategy<O, B> for Identity {
    type Output<'o>
        = &'o O
    where
        O: 'o;

    fn apply<'o>(&self, over: &'o O, _base: &B) -> Result<&'o O, ApplyError> {
        Ok(over)
    }
}

/// Substitutes every overridden field into a copy of the base node.
///
/// Fields that are not overridden keep their base value. Fields that the override's kind declares
/// as [`FieldKind::Overrides`] are skipped whatever they hold (even when empty or null), since those
/// target child nodes, which are looked up and applied separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeFields;

impl<O, B> Strategy<O, B> for MergeFields
where
    O: AsRef<Override> + ?Sized,
    B: Overridable,
{
    type Output<'o>
        = B
    where
        O: 'o;

    fn apply<'o>(&self, over: &'o O, base: &B) -> Result<B, ApplyError> {
        merge_fields(over.as_ref(), base)
    }
}

fn merge_fields<B: Overridable>(over: &Override, base: &B) -> Result<B, ApplyError> {
    tracing::debug!(fields = over.len(), "merging override into base node");

    let mut effective = base.clone();
    for (name, value) in over.iter() {
        let spec = over.kind().field(name);
        if matches!(spec.map(|spec| spec.kind), Some(FieldKind::Overrides(_))) {
            tracing::trace!(field = name, "skipping nested overrides");
            continue;
        }

        let value = expand(name, value, base)?;
        tracing::trace!(field = name, "substituting field");
        effective
            .substitute(name, value)
            .map_err(|source| ApplyError::SubstituteField {
                field: name.to_owned(),
                source: Box::new(source),
            })?;
    }
    Ok(effective)
}

/// Expands placeholders in all strings contained in `value`.
fn expand<B: Overridable>(field: &str, value: &Value, base: &B) -> Result<Value, ApplyError> {
    match value {
        Value::String(text) => expand_str(field, text, base).map(Value::String),
        Value::Sequence(values) => values
            .iter()
            .map(|value| expand(field, value, base))
            .collect::<Result<_, _>>()
            .map(Value::Sequence),
        Value::Mapping(entries) => entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), expand(field, value, base)?)))
            .collect::<Result<_, _>>()
            .map(Value::Mapping),
        other => Ok(other.clone()),
    }
}

fn expand_str<B: Overridable>(field: &str, text: &str, base: &B) -> Result<String, ApplyError> {
    let mut expanded = String::with_capacity(text.len());
    let mut last = 0;

    for captures in PLACEHOLDER_REGEX.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let placeholder = name.as_str();

        let original = base
            .original(placeholder)
            .context(UnresolvedPlaceholderSnafu { field, placeholder })?;
        let rendered = original
            .to_scalar_string()
            .context(NonScalarPlaceholderSnafu {
                field,
                placeholder,
                found: original.kind(),
            })?;

        expanded.push_str(&text[last..whole.start()]);
        expanded.push_str(&rendered);
        last = whole.end();
    }

    expanded.push_str(&text[last..]);
    Ok(expanded)
}
