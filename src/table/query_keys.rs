//! Cache keys for list and detail queries of one entity.

use std::fmt;
use std::sync::Arc;

use super::params::QueryParams;

/// One element of a query key tuple
#[derive(Debug, Clone)]
pub enum KeySegment {
    Id(i64),
    Params(Arc<QueryParams>),
    Str(String),
}

impl PartialEq for KeySegment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeySegment::Id(a), KeySegment::Id(b)) => a == b,
            (KeySegment::Params(a), KeySegment::Params(b)) => Arc::ptr_eq(a, b) || a == b,
            (KeySegment::Str(a), KeySegment::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for KeySegment {
    fn from(s: &str) -> Self {
        KeySegment::Str(s.to_string())
    }
}

impl From<i64> for KeySegment {
    fn from(id: i64) -> Self {
        KeySegment::Id(id)
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Id(id) => write!(f, "{id}"),
            KeySegment::Params(params) => write!(f, "{:?}", params.to_query_pairs()),
            KeySegment::Str(s) => f.write_str(s),
        }
    }
}

pub type QueryKey = Vec<KeySegment>;

/// Key factory for one entity (`users`, `departments`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKeys {
    entity: String,
}

impl QueryKeys {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
        }
    }

    pub fn all(&self) -> QueryKey {
        vec![KeySegment::Str(self.entity.clone())]
    }

    pub fn lists(&self) -> QueryKey {
        let mut key = self.all();
        key.push("list".into());
        key
    }

    /// The params slot shares the caller's `Arc`
    pub fn list(&self, params: &Arc<QueryParams>) -> QueryKey {
        let mut key = self.lists();
        key.push(KeySegment::Params(Arc::clone(params)));
        key
    }

    pub fn details(&self) -> QueryKey {
        let mut key = self.all();
        key.push("detail".into());
        key
    }

    pub fn detail(&self, id: i64) -> QueryKey {
        let mut key = self.details();
        key.push(id.into());
        key
    }
}
