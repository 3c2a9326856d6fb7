use delegate::delegate;
use serde::Serialize;

use crate::{
    apply::{Apply, ApplyError, Identity, Strategy},
    bag::AttributeBag,
    overrides::{Override, OverrideKind, PROPERTY},
    validation::{Validate, ValidationError, Validator},
    value::Value,
};

/// An override of a single property of a resource.
///
/// Properties are addressed by name, or by a dotted path (`parent.child`) for nested properties.
/// The path is the key the override is stored under in its parent [`ResourceOverride`]; it is not
/// interpreted here.
///
/// [`ResourceOverride`]: crate::ResourceOverride
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent, bound = "")]
pub struct PropertyOverride<S = Identity> {
    node: Override,
    #[serde(skip)]
    strategy: S,
}

impl PropertyOverride {
    pub fn new() -> Self {
        Self::with_kind(&PROPERTY)
    }

    /// Creates an empty override whose recognized fields are declared by `kind` rather than by
    /// [`PROPERTY`].
    pub fn with_kind(kind: &'static OverrideKind) -> Self {
        Self::from_node(Override::new(kind))
    }

    pub fn from_map<K, V>(map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_node(Override::from_map(&PROPERTY, map))
    }

    pub fn from_node(node: Override) -> Self {
        Self {
            node,
            strategy: Identity,
        }
    }
}

impl Default for PropertyOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PropertyOverride<S> {
    /// Replaces the merge strategy used by [`Apply::apply`].
    pub fn with_strategy<T>(self, strategy: T) -> PropertyOverride<T> {
        PropertyOverride {
            node: self.node,
            strategy,
        }
    }

    pub fn as_override(&self) -> &Override {
        &self.node
    }

    pub fn into_override(self) -> Override {
        self.node
    }

    delegate! {
        to self.node {
            pub fn kind(&self) -> &'static OverrideKind;

            /// Returns the value of the field `name`, which may be given with or without its `@` prefix.
            pub fn get(&self, name: &str) -> Option<&Value>;

            pub fn contains(&self, name: &str) -> bool;

            /// Returns `true` if no field has been set at all.
            pub fn is_empty(&self) -> bool;

            pub fn len(&self) -> usize;

            pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)>;
        }
    }
}

impl<S> Validate for PropertyOverride<S> {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        self.node.validate_with(validator)
    }
}

impl<S, B: ?Sized> Apply<B> for PropertyOverride<S>
where
    S: Strategy<Self, B>,
{
    type Output<'a>
        = S::Output<'a>
    where
        Self: 'a;

    fn apply<'a>(&'a self, base: &B) -> Result<Self::Output<'a>, ApplyError> {
        tracing::debug!(kind = self.kind().name, "applying property override");
        self.strategy.apply(self, base)
    }
}

impl<S> AsRef<Override> for PropertyOverride<S> {
    fn as_ref(&self) -> &Override {
        &self.node
    }
}

impl<S> AsRef<AttributeBag> for PropertyOverride<S> {
    fn as_ref(&self) -> &AttributeBag {
        self.node.as_bag().as_ref()
    }
}

impl<S> From<PropertyOverride<S>> for Value {
    fn from(over: PropertyOverride<S>) -> Self {
        Self::Override(over.node)
    }
}
