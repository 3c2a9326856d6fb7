//! The sparse field storage shared by every override type.
use std::collections::{BTreeMap, btree_map};

use serde::Serialize;

use crate::value::Value;

/// Strips the `@` prefix that may be used to address a field.
///
/// `"@description"` and `"description"` refer to the same field.
pub(crate) fn field_name(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

fn owned_field_name(name: String) -> String {
    match name.strip_prefix('@') {
        Some(stripped) => stripped.to_owned(),
        None => name,
    }
}

/// A sparse mapping from field name to [`Value`].
///
/// A field that was never set is absent, which is distinct from a field that was set to
/// [`Value::Null`]. Field names are stored without their `@` prefix, so both addressing forms
/// resolve to the same slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeBag {
    fields: BTreeMap<String, Value>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from ready-made `(name, value)` pairs, such as a parsed configuration mapping.
    ///
    /// Later pairs replace earlier pairs that address the same field.
    pub fn from_map<K, V>(map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        map.into_iter().collect()
    }

    /// Returns the value of the field `name`, which may be given with or without its `@` prefix.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(field_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(field_name(name))
    }

    /// Sets the field `name`, returning the value it previously held.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields
            .insert(owned_field_name(name.into()), value.into())
    }

    /// Returns `true` if no field has been set at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates over all set fields by their bare name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

impl From<BTreeMap<String, Value>> for AttributeBag {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::from_map(map)
    }
}

impl IntoIterator for AttributeBag {
    type IntoIter = btree_map::IntoIter<String, Value>;
    type Item = (String, Value);

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
