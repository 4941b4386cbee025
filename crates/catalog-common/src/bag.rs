//! Flat, namespaced attribute mappings.

use serde::{Serialize, Serializer};
use std::collections::btree_map::{self, BTreeMap};

use crate::value::AttrValue;

/// Flat mapping of namespaced keys (`namespace:field`) to canonical values.
///
/// Iteration is always in sorted-key order. The set operations return new
/// bags and leave their inputs untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    entries: BTreeMap<String, AttrValue>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AttrValue> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Union of both bags; on key collisions the value from `other` wins.
    pub fn merge(&self, other: &AttributeBag) -> AttributeBag {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        AttributeBag { entries }
    }

    /// Pairs present in both bags with identical values.
    pub fn intersect(&self, other: &AttributeBag) -> AttributeBag {
        let entries = self
            .entries
            .iter()
            .filter(|(k, v)| other.entries.get(*k) == Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        AttributeBag { entries }
    }

    /// Intersection across any number of bags. `None` when there are no bags.
    pub fn intersect_all<'a, I>(bags: I) -> Option<AttributeBag>
    where
        I: IntoIterator<Item = &'a AttributeBag>,
    {
        let mut iter = bags.into_iter();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, bag| acc.intersect(bag)))
    }

    /// Drop every pair whose value equals the one in `common`, keeping the
    /// keys listed in `retain` regardless.
    pub fn subtract(&self, common: &AttributeBag, retain: &[&str]) -> AttributeBag {
        let entries = self
            .entries
            .iter()
            .filter(|(k, v)| retain.contains(&k.as_str()) || common.entries.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        AttributeBag { entries }
    }
}

impl Serialize for AttributeBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for AttributeBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        AttributeBag { entries }
    }
}

impl<K: Into<String>, V: Into<AttrValue>> Extend<(K, V)> for AttributeBag {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for AttributeBag {
    type Item = (String, AttrValue);
    type IntoIter = btree_map::IntoIter<String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributeBag {
    type Item = (&'a String, &'a AttrValue);
    type IntoIter = btree_map::Iter<'a, String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
