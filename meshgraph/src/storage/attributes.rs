// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Key/value attribute bag attached to every node, edge and graph

use crate::storage::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered attribute bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: IndexMap<String, Value>,
}

impl Attributes {
    /// Create an empty attribute bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an attribute value, `None` when unset
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check whether an attribute is set
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set an attribute, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Remove an attribute, returning its value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    /// Functional update: the updater receives the current value (if any)
    /// and returns the new one.
    pub fn update<F>(&mut self, name: &str, updater: F) -> &Value
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let next = updater(self.values.get(name));
        let entry = self.values.entry(name.to_string()).or_insert(Value::Null);
        *entry = next;
        entry
    }

    /// Shallow merge: every entry of `other` overwrites the same key here
    pub fn merge(&mut self, other: Attributes) {
        for (name, value) in other.values {
            self.values.insert(name, value);
        }
    }

    /// Replace the whole bag
    pub fn replace(&mut self, other: Attributes) -> Attributes {
        std::mem::replace(self, other)
    }

    /// Remove every attribute
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (name, value) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attribute names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Build an [`Attributes`] bag from `name => value` pairs.
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::Attributes::new();
        $(attributes.set($name, $value);)+
        attributes
    }};
}
