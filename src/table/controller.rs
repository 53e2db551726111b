//! Query, sort, selection and column-visibility state for one list view.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::params::QueryParams;
use super::sorting::{derive_sorting, ColumnSort, SortDescriptor, SortFieldMap};
use super::update::StateUpdate;
use super::visibility::{ColumnVisibility, VisibilityStore};

/// Row index on the current page -> selected.
pub type RowSelection = BTreeMap<usize, bool>;

/// Single source of truth for a paginated, sortable, filterable table.
///
/// `T` is the row type. Rows are handed in as a shared buffer; a new
/// buffer means a new dataset, which always drops the row selection.
pub struct TableController<T> {
    column_visibility: ColumnVisibility,
    defaults: QueryParams,
    fields: SortFieldMap,
    identity: String,
    params: QueryParams,
    row_selection: RowSelection,
    rows: Option<Arc<Vec<T>>>,
    visibility_store: VisibilityStore,
}

impl<T> TableController<T> {
    /// Seed the controller from `defaults` and restore the stored column
    /// visibility for `identity`.
    pub fn new(
        identity: impl Into<String>,
        defaults: QueryParams,
        visibility_store: VisibilityStore,
    ) -> Self {
        let identity = identity.into();
        let column_visibility = visibility_store.load(&identity);
        debug!(
            table = %identity,
            hidden = column_visibility.values().filter(|v| !**v).count(),
            "Table state initialized"
        );

        Self {
            column_visibility,
            params: defaults.clone(),
            defaults,
            fields: SortFieldMap::default(),
            identity,
            row_selection: RowSelection::new(),
            rows: None,
            visibility_store,
        }
    }

    /// Use `fields` to translate between column ids and sort fields
    pub fn with_sort_fields(mut self, fields: SortFieldMap) -> Self {
        self.fields = fields;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn defaults(&self) -> &QueryParams {
        &self.defaults
    }

    pub fn sorting(&self) -> SortDescriptor {
        derive_sorting(&self.params, &self.fields)
    }

    pub fn row_selection(&self) -> &RowSelection {
        &self.row_selection
    }

    pub fn column_visibility(&self) -> &ColumnVisibility {
        &self.column_visibility
    }

    pub fn is_column_visible(&self, column_id: &str) -> bool {
        self.column_visibility
            .get(column_id)
            .copied()
            .unwrap_or(true)
    }

    // ========================================================================
    // Query parameters
    // ========================================================================

    /// Apply a new sort. An empty descriptor restores the default ordering.
    /// Any sort change goes back to page 1.
    pub fn change_sort(&mut self, sorting: &[ColumnSort]) {
        self.params.sort = match sorting.first() {
            Some(sort) => Some(self.fields.to_sort_key(sort)),
            None => self.defaults.sort.clone(),
        };
        self.params.page = 1;
        debug!(
            table = %self.identity,
            sort = ?self.params.sort_field(),
            order = ?self.params.order(),
            "Sort changed"
        );
    }

    /// Move to another page or page size; everything else is kept.
    pub fn change_pagination(&mut self, page: u32, limit: u32) {
        self.params.page = page;
        self.params.limit = limit;
        trace!(table = %self.identity, page, limit, "Pagination changed");
    }

    /// Replace all parameters with `params`, starting over at page 1.
    pub fn change_filters(&mut self, params: QueryParams) {
        self.params = QueryParams { page: 1, ..params };
        debug!(
            table = %self.identity,
            search = ?self.params.search,
            filters = self.params.filters.len(),
            "Filters changed"
        );
    }

    /// Set parameters directly, skipping the page reset rules.
    pub fn set_params(&mut self, update: impl Into<StateUpdate<QueryParams>>) {
        self.params = update.into().apply(&self.params);
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Update column visibility and persist it. A storage failure leaves the
    /// new state in memory only.
    pub fn set_column_visibility(&mut self, update: impl Into<StateUpdate<ColumnVisibility>>) {
        self.column_visibility = update.into().apply(&self.column_visibility);
        if let Err(e) = self
            .visibility_store
            .save(&self.identity, &self.column_visibility)
        {
            debug!(table = %self.identity, error = %e, "Column visibility not persisted");
        }
    }

    // ========================================================================
    // Rows and selection
    // ========================================================================

    /// Install the current dataset. A different buffer than the previous
    /// one clears the selection before returning.
    pub fn set_rows(&mut self, rows: Arc<Vec<T>>) {
        let changed = match &self.rows {
            Some(current) => !Arc::ptr_eq(current, &rows),
            None => true,
        };
        if changed {
            self.row_selection.clear();
            trace!(table = %self.identity, rows = rows.len(), "Dataset replaced");
        }
        self.rows = Some(rows);
    }

    pub fn rows(&self) -> Option<&Arc<Vec<T>>> {
        self.rows.as_ref()
    }

    pub fn set_row_selection(&mut self, update: impl Into<StateUpdate<RowSelection>>) {
        self.row_selection = update.into().apply(&self.row_selection);
    }

    pub fn reset_selection(&mut self) {
        self.row_selection.clear();
    }

    /// Rows of the current dataset whose index is selected
    pub fn selected_rows(&self) -> Vec<&T> {
        let Some(rows) = &self.rows else {
            return Vec::new();
        };
        self.row_selection
            .iter()
            .filter(|(_, selected)| **selected)
            .filter_map(|(index, _)| rows.get(*index))
            .collect()
    }
}

impl<T> std::fmt::Debug for TableController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableController")
            .field("identity", &self.identity)
            .field("params", &self.params)
            .field("column_visibility", &self.column_visibility)
            .field("row_selection", &self.row_selection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::table::params::SortOrder;
    use crate::table::StateUpdate;
    use crate::testutil::FailingStore;

    fn defaults() -> QueryParams {
        QueryParams::new(1, 20).with_sort("createdAt", SortOrder::Desc)
    }

    fn controller() -> TableController<String> {
        let store = VisibilityStore::new(Arc::new(MemoryStore::new()), "table-columns:");
        TableController::new("users", defaults(), store)
            .with_sort_fields(SortFieldMap::new().with("department", "department.name"))
    }

    #[test]
    fn test_initial_state() {
        let table = controller();
        assert_eq!(table.params(), &defaults());
        assert_eq!(table.sorting(), vec![ColumnSort::desc("createdAt")]);
        assert!(table.row_selection().is_empty());
        assert!(table.column_visibility().is_empty());
    }

    #[test]
    fn test_change_sort_sets_field_order_and_page() {
        let mut table = controller();
        table.change_pagination(4, 20);

        table.change_sort(&[ColumnSort::asc("name")]);

        let params = table.params();
        assert_eq!(params.sort_field(), Some("name"));
        assert_eq!(params.order(), Some(SortOrder::Asc));
        assert_eq!(params.page, 1);
    }

    #[test]
    fn test_change_sort_uses_field_map() {
        let mut table = controller();
        table.change_sort(&[ColumnSort::desc("department")]);
        assert_eq!(table.params().sort_field(), Some("department.name"));
        assert_eq!(table.sorting(), vec![ColumnSort::desc("department")]);
    }

    #[test]
    fn test_clearing_sort_restores_defaults() {
        let mut table = controller();
        table.change_sort(&[ColumnSort::asc("name")]);
        table.change_sort(&[]);

        assert_eq!(table.params().sort_field(), Some("createdAt"));
        assert_eq!(table.params().order(), Some(SortOrder::Desc));
    }

    #[test]
    fn test_clearing_sort_without_default_sort_removes_it() {
        let store = VisibilityStore::new(Arc::new(MemoryStore::new()), "p:");
        let mut table: TableController<()> =
            TableController::new("logs", QueryParams::default(), store);
        table.change_sort(&[ColumnSort::asc("action")]);
        table.change_sort(&[]);
        assert_eq!(table.params().sort, None);
    }

    #[test]
    fn test_pagination_preserves_filters() {
        let mut table = controller();
        table.change_filters(
            defaults()
                .with_search("smith")
                .with_filter("departmentId", 3),
        );
        let before = table.params().clone();

        table.change_pagination(3, 50);

        let after = table.params();
        assert_eq!(after.page, 3);
        assert_eq!(after.limit, 50);
        assert_eq!(after.search, before.search);
        assert_eq!(after.filters, before.filters);
        assert_eq!(after.sort, before.sort);
    }

    #[test]
    fn test_change_filters_forces_first_page() {
        let mut table = controller();
        let mut params = defaults().with_filter("role", "admin");
        params.page = 7;

        table.change_filters(params);

        assert_eq!(table.params().page, 1);
        assert_eq!(table.params().filters["role"], "admin");
    }

    #[test]
    fn test_set_params_bypasses_page_reset() {
        let mut table = controller();
        table.set_params(StateUpdate::update(|p: &QueryParams| QueryParams {
            page: 9,
            ..p.clone()
        }));
        assert_eq!(table.params().page, 9);
    }

    #[test]
    fn test_visibility_functional_update_and_reload() {
        let store = VisibilityStore::new(Arc::new(MemoryStore::new()), "table-columns:");
        let mut table: TableController<()> =
            TableController::new("users", defaults(), store.clone());

        let mut hidden = ColumnVisibility::new();
        hidden.insert("email".to_string(), false);
        table.set_column_visibility(hidden);
        table.set_column_visibility(StateUpdate::update(|prev: &ColumnVisibility| {
            let mut next = prev.clone();
            next.insert("phone".to_string(), false);
            next
        }));

        assert!(!table.is_column_visible("email"));
        assert!(table.is_column_visible("username"));

        let reloaded: TableController<()> = TableController::new("users", defaults(), store);
        assert_eq!(reloaded.column_visibility(), table.column_visibility());
    }

    #[test]
    fn test_visibility_updates_in_memory_when_storage_fails() {
        let store = VisibilityStore::new(Arc::new(FailingStore), "table-columns:");
        let mut table: TableController<()> = TableController::new("users", defaults(), store);

        let mut hidden = ColumnVisibility::new();
        hidden.insert("email".to_string(), false);
        table.set_column_visibility(hidden.clone());

        assert_eq!(table.column_visibility(), &hidden);
    }

    #[test]
    fn test_new_dataset_clears_selection() {
        let mut table = controller();
        let page_one = Arc::new(vec!["a".to_string(), "b".to_string()]);
        table.set_rows(Arc::clone(&page_one));
        table.set_row_selection(RowSelection::from([(1, true)]));
        assert_eq!(table.selected_rows(), vec!["b"]);

        // Same buffer again keeps the selection
        table.set_rows(Arc::clone(&page_one));
        assert_eq!(table.row_selection().len(), 1);

        // Equal content, different buffer: new dataset
        table.set_rows(Arc::new(vec!["a".to_string(), "b".to_string()]));
        assert!(table.row_selection().is_empty());
    }

    #[test]
    fn test_reset_selection() {
        let mut table = controller();
        table.set_rows(Arc::new(vec!["a".to_string()]));
        table.set_row_selection(RowSelection::from([(0, true)]));
        table.reset_selection();
        assert!(table.row_selection().is_empty());
        assert!(table.selected_rows().is_empty());
    }

    #[test]
    fn test_selected_rows_skip_out_of_range_and_unselected() {
        let mut table = controller();
        table.set_rows(Arc::new(vec!["a".to_string(), "b".to_string()]));
        table.set_row_selection(RowSelection::from([(0, false), (1, true), (5, true)]));
        assert_eq!(table.selected_rows(), vec!["b"]);
    }
}
