//! Paths to positions in a GraphQL response.
//!
//! A [`QueryPath`] locates one value in the response tree: a sequence of response keys and list
//! indices from the operation root down to the value. Paths are attached to errors so clients can
//! point at the part of the query that failed, and they key the deduplication of non-null
//! violations (at most one such error per path).

use std::fmt::{self, Display, Formatter};

use internment::ArcIntern;
use serde::Serialize;

/// One step of a [`QueryPath`]: a field's response key, or an index into a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum QueryPathSegment {
    Field(ArcIntern<String>),
    Index(usize),
}

impl QueryPathSegment {
    pub fn field(name: &str) -> Self {
        QueryPathSegment::Field(ArcIntern::from_ref(name))
    }
}

impl From<usize> for QueryPathSegment {
    fn from(index: usize) -> Self {
        QueryPathSegment::Index(index)
    }
}

impl From<&str> for QueryPathSegment {
    fn from(name: &str) -> Self {
        QueryPathSegment::field(name)
    }
}

impl Display for QueryPathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryPathSegment::Field(name) => f.write_str(name),
            QueryPathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// The path from the operation root to a value in the response.
///
/// Serializes as the mixed string/integer array the GraphQL response format expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct QueryPath(Vec<QueryPathSegment>);

impl QueryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A new path with `segment` appended; `self` is untouched.
    pub fn child(&self, segment: impl Into<QueryPathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        QueryPath(segments)
    }

    pub fn push(&mut self, segment: impl Into<QueryPathSegment>) {
        self.0.push(segment.into());
    }

    pub fn last(&self) -> Option<&QueryPathSegment> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryPathSegment> {
        self.0.iter()
    }
}

impl FromIterator<QueryPathSegment> for QueryPath {
    fn from_iter<I: IntoIterator<Item = QueryPathSegment>>(iter: I) -> Self {
        QueryPath(iter.into_iter().collect())
    }
}

impl IntoIterator for QueryPath {
    type Item = QueryPathSegment;
    type IntoIter = std::vec::IntoIter<QueryPathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryPath {
    type Item = &'a QueryPathSegment;
    type IntoIter = std::slice::Iter<'a, QueryPathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for QueryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            segment.fmt(f)?;
        }
        Ok(())
    }
}
