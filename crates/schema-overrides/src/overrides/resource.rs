use std::collections::{BTreeMap, btree_map};

use delegate::delegate;
use serde::Serialize;

use crate::{
    apply::{Apply, ApplyError, Identity, Strategy},
    bag::{AttributeBag, field_name},
    overrides::{Override, OverrideKind, PropertyOverride, RESOURCE},
    validation::{Validate, ValidationError, Validator},
    value::Value,
};

/// An override of a whole resource.
///
/// Besides the resource's own fields, it may carry [`PropertyOverride`]s for the resource's
/// `properties` and `parameters`, keyed by property name or dotted path.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent, bound = "")]
pub struct ResourceOverride<S = Identity> {
    node: Override,
    #[serde(skip)]
    strategy: S,
}

impl ResourceOverride {
    pub fn new() -> Self {
        Self::with_kind(&RESOURCE)
    }

    /// Creates an empty override whose recognized fields are declared by `kind` rather than by
    /// [`RESOURCE`].
    pub fn with_kind(kind: &'static OverrideKind) -> Self {
        Self::from_node(Override::new(kind))
    }

    pub fn from_map<K, V>(map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_node(Override::from_map(&RESOURCE, map))
    }

    pub fn from_node(node: Override) -> Self {
        Self {
            node,
            strategy: Identity,
        }
    }
}

impl Default for ResourceOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ResourceOverride<S> {
    /// Replaces the merge strategy used by [`Apply::apply`].
    pub fn with_strategy<T>(self, strategy: T) -> ResourceOverride<T> {
        ResourceOverride {
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

    /// Returns the override for the property stored under `path` in `properties`.
    pub fn property(&self, path: &str) -> Option<PropertyOverride> {
        self.nested_property("properties", path)
    }

    /// Returns the override for the parameter stored under `path` in `parameters`.
    pub fn parameter(&self, path: &str) -> Option<PropertyOverride> {
        self.nested_property("parameters", path)
    }

    fn nested_property(&self, field: &str, path: &str) -> Option<PropertyOverride> {
        let path = field_name(path);
        self.node
            .nested(field)
            .find(|(target, _)| field_name(target) == path)
            .map(|(_, node)| PropertyOverride::from_node(node.clone()))
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

            /// Iterates over the nested overrides stored in the mapping field `name`.
            pub fn nested(&self, name: &str) -> impl Iterator<Item = (&str, &Override)>;
        }
    }
}

impl<S> Validate for ResourceOverride<S> {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        self.node.validate_with(validator)
    }
}

impl<S, B: ?Sized> Apply<B> for ResourceOverride<S>
where
    S: Strategy<Self, B>,
{
    type Output<'a>
        = S::Output<'a>
    where
        Self: 'a;

    fn apply<'a>(&'a self, base: &B) -> Result<Self::Output<'a>, ApplyError> {
        tracing::debug!(kind = self.kind().name, "applying resource override");
        self.strategy.apply(self, base)
    }
}

impl<S> AsRef<Override> for ResourceOverride<S> {
    fn as_ref(&self) -> &Override {
        &self.node
    }
}

impl<S> AsRef<AttributeBag> for ResourceOverride<S> {
    fn as_ref(&self) -> &AttributeBag {
        self.node.as_bag().as_ref()
    }
}

impl<S> From<ResourceOverride<S>> for Value {
    fn from(over: ResourceOverride<S>) -> Self {
        Self::Override(over.node)
    }
}

/// A collection of [`ResourceOverride`]s, keyed by the name of the resource they target.
///
/// Keys are unique: inserting an override for a target that already has one replaces it. As with
/// bag fields, a leading `@` on a key is ignored.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent, bound = "")]
pub struct ResourceOverrides<S = Identity> {
    entries: BTreeMap<String, ResourceOverride<S>>,
}

impl ResourceOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> Default for ResourceOverrides<S> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<S> ResourceOverrides<S> {
    /// Inserts the override for `target`, returning the override it replaced.
    pub fn insert(
        &mut self,
        target: impl Into<String>,
        over: ResourceOverride<S>,
    ) -> Option<ResourceOverride<S>> {
        let target = target.into();
        self.entries.insert(field_name(&target).to_owned(), over)
    }

    pub fn get(&self, target: &str) -> Option<&ResourceOverride<S>> {
        self.entries.get(field_name(target))
    }

    /// Looks up the override stored under the dotted path formed by `segments`.
    pub fn get_path(&self, segments: &[&str]) -> Option<&ResourceOverride<S>> {
        self.get(&segments.join("."))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceOverride<S>)> {
        self.entries
            .iter()
            .map(|(target, over)| (target.as_str(), over))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Replaces the merge strategy of every contained override.
    pub fn with_strategy<T: Clone>(self, strategy: T) -> ResourceOverrides<T> {
        ResourceOverrides {
            entries: self
                .entries
                .into_iter()
                .map(|(target, over)| (target, over.with_strategy(strategy.clone())))
                .collect(),
        }
    }
}

impl<S> Validate for ResourceOverrides<S> {
    fn validate_with(&self, validator: Validator<'_>) -> Result<(), ValidationError> {
        for (target, over) in &self.entries {
            tracing::trace!(resource = %target, "validating resource override");
            over.validate_with(validator.field(target))?;
        }
        Ok(())
    }
}

impl<S, K: Into<String>> FromIterator<(K, ResourceOverride<S>)> for ResourceOverrides<S> {
    fn from_iter<I: IntoIterator<Item = (K, ResourceOverride<S>)>>(iter: I) -> Self {
        let mut overrides = Self::default();
        for (target, over) in iter {
            overrides.insert(target, over);
        }
        overrides
    }
}

impl<S> IntoIterator for ResourceOverrides<S> {
    type IntoIter = btree_map::IntoIter<String, ResourceOverride<S>>;
    type Item = (String, ResourceOverride<S>);

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
