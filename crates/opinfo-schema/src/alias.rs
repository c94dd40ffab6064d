//! Alias annotations attached to argument and return types
//!
//! An annotation such as `(a!)` says the position belongs to alias set `a`
//! and is written by the operator. The `*` set is the wildcard: the position
//! may alias storage the signature does not otherwise account for.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Set token meaning "may alias anything"
pub const WILDCARD_SET: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasAnnotation {
    before: SmallVec<[String; 1]>,
    after: SmallVec<[String; 1]>,
    is_write: bool,
}

impl AliasAnnotation {
    pub fn new<I, S>(sets: I, is_write: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            before: sets.into_iter().map(Into::into).collect(),
            after: SmallVec::new(),
            is_write,
        }
    }

    /// `(set)` annotation: shares storage with `set`, not written
    pub fn read(set: impl Into<String>) -> Self {
        Self::new([set], false)
    }

    /// `(set!)` annotation: shares storage with `set` and is written
    pub fn write(set: impl Into<String>) -> Self {
        Self::new([set], true)
    }

    /// `(*)` annotation
    pub fn wildcard() -> Self {
        Self::new([WILDCARD_SET], false)
    }

    /// Sets the position moves into after the call (`(a -> *)`)
    pub fn with_after_sets<I, S>(mut self, sets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = sets.into_iter().map(Into::into).collect();
        self
    }

    pub fn before_sets(&self) -> &[String] {
        &self.before
    }

    pub fn after_sets(&self) -> &[String] {
        &self.after
    }

    pub fn is_write(&self) -> bool {
        self.is_write
    }

    /// True when either side of the annotation names the wildcard set
    pub fn is_wildcard(&self) -> bool {
        self.before
            .iter()
            .chain(self.after.iter())
            .any(|set| set == WILDCARD_SET)
    }

    /// Declared sets other than the wildcard
    pub fn concrete_sets(&self) -> impl Iterator<Item = &str> {
        self.before
            .iter()
            .map(String::as_str)
            .filter(|set| *set != WILDCARD_SET)
    }
}

impl fmt::Display for AliasAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.before.join("|"))?;
        if self.is_write {
            write!(f, "!")?;
        }
        if !self.after.is_empty() {
            write!(f, " -> {}", self.after.join("|"))?;
        }
        Ok(())
    }
}
