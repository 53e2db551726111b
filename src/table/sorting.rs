use serde::{Deserialize, Serialize};

use super::params::{QueryParams, SortKey, SortOrder};

/// One active column sort, as table rendering code sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSort {
    pub desc: bool,
    pub id: String,
}

impl ColumnSort {
    pub fn asc(id: impl Into<String>) -> Self {
        Self {
            desc: false,
            id: id.into(),
        }
    }

    pub fn desc(id: impl Into<String>) -> Self {
        Self {
            desc: true,
            id: id.into(),
        }
    }
}

/// At most one entry: single-column sort model.
pub type SortDescriptor = Vec<ColumnSort>;

/// Mapping between display column ids and backend sort fields.
///
/// Columns without an entry sort by their own id. When several columns map
/// to one field, the first registered wins on the way back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortFieldMap {
    entries: Vec<(String, String)>,
}

impl SortFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column_id: impl Into<String>, field: impl Into<String>) -> Self {
        self.entries.push((column_id.into(), field.into()));
        self
    }

    pub fn field_for<'a>(&'a self, column_id: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(column, _)| column == column_id)
            .map(|(_, field)| field.as_str())
            .unwrap_or(column_id)
    }

    pub fn column_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, f)| f == field)
            .map(|(column, _)| column.as_str())
            .unwrap_or(field)
    }

    /// Translate a descriptor into wire sort parameters
    pub fn to_sort_key(&self, sort: &ColumnSort) -> SortKey {
        SortKey::new(self.field_for(&sort.id), SortOrder::from_desc(sort.desc))
    }
}

impl<C: Into<String>, F: Into<String>> FromIterator<(C, F)> for SortFieldMap {
    fn from_iter<I: IntoIterator<Item = (C, F)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(c, f)| (c.into(), f.into()))
                .collect(),
        }
    }
}

/// Derive the sort descriptor from flat parameters
pub fn derive_sorting(params: &QueryParams, fields: &SortFieldMap) -> SortDescriptor {
    match &params.sort {
        Some(sort) => vec![ColumnSort {
            desc: sort.order.is_desc(),
            id: fields.column_for(&sort.field).to_string(),
        }],
        None => Vec::new(),
    }
}
