//! Output parameters returned by a stored procedure call

use std::collections::{BTreeMap, HashMap};

use crate::Value;

/// Output values of a call statement.
///
/// Every value has a 0-based position. Values registered with a name can
/// also be looked up by that name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutParameters {
    values: BTreeMap<usize, Value>,
    names: HashMap<String, usize>,
}

impl OutParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value at `position`, optionally addressable by `name`.
    ///
    /// A later insert at the same position replaces the earlier value.
    pub fn insert(&mut self, position: usize, name: Option<&str>, value: impl Into<Value>) {
        if let Some(name) = name {
            self.names.insert(name.to_string(), position);
        }
        self.values.insert(position, value.into());
    }

    /// Builder-style variant of [`OutParameters::insert`]
    pub fn with(mut self, position: usize, name: Option<&str>, value: impl Into<Value>) -> Self {
        self.insert(position, name, value);
        self
    }

    /// Get a value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .get(name)
            .and_then(|position| self.values.get(position))
    }

    /// Get a value by position
    pub fn get_at(&self, position: usize) -> Option<&Value> {
        self.values.get(&position)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Position registered for `name`
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate values in position order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.values.iter().map(|(position, value)| (*position, value))
    }
}
