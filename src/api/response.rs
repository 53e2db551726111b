use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Paginated list envelope
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: u32,
    pub page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// One page of a list endpoint: `{ data: [...], pagination: {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Split into a shared row buffer (for a table controller) and the
    /// pagination info.
    pub fn into_shared(self) -> (Arc<Vec<T>>, Pagination) {
        (Arc::new(self.data), self.pagination)
    }
}
