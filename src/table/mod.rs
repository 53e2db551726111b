//! List-view state: query parameters, sorting, selection, column visibility.

mod controller;
pub mod params;
pub mod query_keys;
pub mod sorting;
mod update;
pub mod visibility;

pub use controller::{RowSelection, TableController};
pub use params::{QueryParams, SortKey, SortOrder};
pub use query_keys::{KeySegment, QueryKey, QueryKeys};
pub use sorting::{ColumnSort, SortDescriptor, SortFieldMap};
pub use update::StateUpdate;
pub use visibility::{ColumnVisibility, VisibilityStore};
