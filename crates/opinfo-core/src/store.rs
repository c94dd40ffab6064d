//! Per-call-site argument bindings

use crate::value::ArgumentValue;
use indexmap::IndexMap;

/// Read-only view of bound values handed to special-case rules
pub trait ValueLookup {
    fn is_bound(&self, name: &str) -> bool;

    /// Boolean view of a bound value; `None` if unbound or not a boolean
    fn bool_value(&self, name: &str) -> Option<bool>;

    fn list_len(&self, name: &str) -> Option<usize>;

    /// Bound to the none value
    fn is_none_value(&self, name: &str) -> bool;
}

/// Argument name to bound value. Entries are never removed; rebinding
/// replaces the previous value.
#[derive(Debug, Clone)]
pub struct ValueStore<V> {
    values: IndexMap<String, V>,
}

impl<V> Default for ValueStore<V> {
    fn default() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }
}

impl<V: ArgumentValue> ValueStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the value it replaced
    pub fn bind(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Storage overlap between two bound arguments; false if either is unbound
    pub fn overlaps(&self, lhs: &str, rhs: &str) -> bool {
        match (self.values.get(lhs), self.values.get(rhs)) {
            (Some(a), Some(b)) => a.overlaps(b),
            _ => false,
        }
    }
}

impl<V: ArgumentValue> ValueLookup for ValueStore<V> {
    fn is_bound(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn bool_value(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(ArgumentValue::as_bool)
    }

    fn list_len(&self, name: &str) -> Option<usize> {
        self.values.get(name).and_then(ArgumentValue::list_len)
    }

    fn is_none_value(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(ArgumentValue::is_none)
    }
}
