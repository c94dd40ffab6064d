//! Argument values bound at a call site
//!
//! The analysis never computes on values. It asks two things of them: whether
//! two values reference overlapping storage, and a few scalar views that
//! special-case rules inspect (boolean flags, list lengths).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value representation consumed by the analysis
pub trait ArgumentValue: fmt::Debug {
    /// True if both values reference overlapping storage
    fn overlaps(&self, other: &Self) -> bool;

    fn as_bool(&self) -> Option<bool> {
        None
    }

    fn list_len(&self) -> Option<usize> {
        None
    }

    fn is_none(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageId(pub u64);

/// A view into a storage buffer: elements `offset..offset + len`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorRef {
    pub storage: StorageId,
    pub offset: usize,
    pub len: usize,
}

impl TensorRef {
    pub fn new(storage: u64, offset: usize, len: usize) -> Self {
        Self {
            storage: StorageId(storage),
            offset,
            len,
        }
    }

    /// Full view of a fresh storage
    pub fn whole(storage: u64, len: usize) -> Self {
        Self::new(storage, 0, len)
    }

    /// One past the last element, clamped at `usize::MAX`
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.len)
    }

    /// Same storage and intersecting element ranges; empty views never overlap
    pub fn overlaps(&self, other: &TensorRef) -> bool {
        self.storage == other.storage
            && self.len > 0
            && other.len > 0
            && self.offset < other.end()
            && other.offset < self.end()
    }
}

/// Reference value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Tensor(TensorRef),
    List(Vec<Value>),
}

impl Value {
    pub fn tensor(storage: u64, offset: usize, len: usize) -> Self {
        Value::Tensor(TensorRef::new(storage, offset, len))
    }
}

impl ArgumentValue for Value {
    fn overlaps(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Tensor(a), Value::Tensor(b)) => a.overlaps(b),
            (Value::List(items), other) => items.iter().any(|item| item.overlaps(other)),
            (this, Value::List(items)) => items.iter().any(|item| this.overlaps(item)),
            _ => false,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn list_len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            _ => None,
        }
    }

    fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<TensorRef> for Value {
    fn from(t: TensorRef) -> Self {
        Value::Tensor(t)
    }
}
