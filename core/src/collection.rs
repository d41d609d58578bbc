//! Nested key-value container addressed by dotted paths.
//!
//! # Design
//! Items live in an insertion-ordered `serde_json::Map`. A key such as
//! `"user.address.city"` walks nested objects; numeric segments also index
//! into arrays (`"items.0.id"`).
//!
//! Lookup order: a literal top-level key wins over dotted traversal. A key
//! that literally contains a dot is therefore reachable only while no
//! literal lookup fails; once it does, the key is read as a path.
//!
//! `set` creates intermediate objects as needed and silently replaces any
//! scalar found along the path with an empty object. An index one past the
//! end of an array appends; any other key an array cannot hold turns the
//! array into an object keyed by index, keeping its items.
//! `remove` on an array element shifts the later elements down.
//! Nothing in this module returns an error: misses degrade to defaults.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Dotted-path container used for configuration and collection-shaped responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Collection {
    items: Map<String, Value>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection by `set`-ing every entry, so dotted keys nest.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut collection = Self::new();
        for (key, value) in map {
            collection.set(&key, value);
        }
        collection
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.items
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.items.clone()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.items
    }

    /// Value at `key`, literal key first, then dotted traversal.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.items.get(key) {
            return Some(value);
        }
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.items.get(first)?;
        for segment in segments {
            current = child(current, segment)?;
        }
        Some(current)
    }

    /// Like `get`, falling back to `default` the moment a segment is missing.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// True when `key` resolves to a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = key.split('.').collect();
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        let slot = self.items.entry(head.to_string()).or_insert(Value::Null);
        set_in(slot, rest, value.into());
    }

    pub fn add(&mut self, key: &str, value: impl Into<Value>) {
        self.set(key, value);
    }

    /// Remove `key`. A path that does not fully resolve leaves the
    /// collection untouched.
    pub fn remove(&mut self, key: &str) {
        if self.items.shift_remove(key).is_some() {
            return;
        }
        let segments: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let Some((head, rest)) = parents.split_first() else {
            return;
        };
        let Some(mut parent) = self.items.get_mut(*head) else {
            return;
        };
        for segment in rest {
            match child_mut(parent, segment) {
                Some(next) => parent = next,
                None => return,
            }
        }
        match parent {
            Value::Object(map) => {
                map.shift_remove(*last);
            }
            Value::Array(items) => {
                if let Some(index) = last.parse::<usize>().ok().filter(|i| *i < items.len()) {
                    items.remove(index);
                }
            }
            _ => {}
        }
    }

    pub fn forget(&mut self, key: &str) {
        self.remove(key);
    }

    /// `set` every entry of `other` into this collection and return a copy
    /// of the merged data.
    pub fn merge<I>(&mut self, other: I) -> Collection
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in other {
            self.set(&key, value);
        }
        Collection {
            items: self.items.clone(),
        }
    }

    /// New collection holding the dotted `get` of each key; missing and
    /// null values are skipped.
    pub fn only<S: AsRef<str>>(&self, keys: &[S]) -> Collection {
        let mut result = Collection::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = self.get(key).filter(|v| !v.is_null()) {
                result.set(key, value.clone());
            }
        }
        result
    }

    /// New collection without the given top-level keys.
    pub fn except<S: AsRef<str>>(&self, keys: &[S]) -> Collection {
        let items = self
            .items
            .iter()
            .filter(|(k, _)| !keys.iter().any(|key| key.as_ref() == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Collection { items }
    }

    pub fn first(&self) -> Option<&Value> {
        self.items.values().next()
    }

    pub fn last(&self) -> Option<&Value> {
        self.items.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.items.iter()
    }

    /// JSON encoding of the items; non-ASCII text is written unescaped.
    pub fn to_json(&self) -> String {
        Value::Object(self.items.clone()).to_string()
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

fn set_in(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };
    if let Value::Array(items) = slot {
        match head.parse::<usize>() {
            Ok(index) if index < items.len() => {
                set_in(&mut items[index], rest, value);
                return;
            }
            Ok(index) if index == items.len() => {
                items.push(Value::Null);
                if let Some(item) = items.last_mut() {
                    set_in(item, rest, value);
                }
                return;
            }
            // Sparse or named key: keep the items under their indices.
            _ => {
                let keyed = std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect();
                *slot = Value::Object(keyed);
            }
        }
    }
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let next = map.entry(head.to_string()).or_insert(Value::Null);
        set_in(next, rest, value);
    }
}

impl From<Map<String, Value>> for Collection {
    fn from(map: Map<String, Value>) -> Self {
        Collection::from_map(map)
    }
}

impl FromIterator<(String, Value)> for Collection {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut collection = Collection::new();
        for (key, value) in iter {
            collection.set(&key, value);
        }
        collection
    }
}

impl IntoIterator for Collection {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Missing keys read as `Value::Null`.
impl Index<&str> for Collection {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
