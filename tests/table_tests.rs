//! Table controller end to end: persisted column layouts and list fetches.

mod common;

use std::sync::Arc;

use axum::extract::RawQuery;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use common::{spawn_server, test_config, Harness};
use dept_admin_client::api::Resource;
use dept_admin_client::navigation::MemoryNavigator;
use dept_admin_client::notify::CollectingNotifier;
use dept_admin_client::storage::{Database, KeyValueStore};
use dept_admin_client::table::{
    ColumnSort, ColumnVisibility, QueryParams, SortOrder, StateUpdate, TableController,
};
use dept_admin_client::AppState;

fn open_state(dir: &TempDir) -> AppState {
    let db: Arc<dyn KeyValueStore> = Arc::new(Database::open(dir.path()).unwrap());
    AppState::new(
        test_config("http://127.0.0.1:9/api"),
        db,
        Arc::new(MemoryNavigator::default()),
        Arc::new(CollectingNotifier::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_column_visibility_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let state = open_state(&dir);
        let mut table: TableController<Value> = state.table("users", QueryParams::default());
        table.set_column_visibility(StateUpdate::update(|prev: &ColumnVisibility| {
            let mut next = prev.clone();
            next.insert("email".to_string(), false);
            next
        }));
    }

    let state = open_state(&dir);
    let users: TableController<Value> = state.table("users", QueryParams::default());
    assert!(!users.is_column_visible("email"));
    assert!(users.is_column_visible("username"));

    // Layouts are per table
    let departments: TableController<Value> = state.table("departments", QueryParams::default());
    assert!(departments.column_visibility().is_empty());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let state = open_state(&dir);
        state.session.login(common::make_user(3, "carol"));
    }

    let state = open_state(&dir);
    assert!(state.session.is_hydrated());
    assert!(state.session.is_authenticated());
    assert_eq!(state.session.user().unwrap().username, "carol");
}

#[tokio::test]
async fn test_controller_params_drive_list_requests() {
    let app = Router::new().route(
        "/api/users",
        get(|RawQuery(query): RawQuery| async move {
            Json(json!({
                "data": [{ "id": 1, "username": "alice", "query": query }],
                "pagination": { "page": 1, "limit": 10, "total": 1, "totalPages": 1 }
            }))
        }),
    );
    let base = spawn_server(app).await;
    let h = Harness::signed_in(&base);
    let store: Arc<dyn KeyValueStore> = h.store.clone();
    let visibility = dept_admin_client::table::VisibilityStore::new(store, "table-columns:");

    let defaults = QueryParams::new(1, 10).with_sort("createdAt", SortOrder::Desc);
    let mut table: TableController<Value> = TableController::new("users", defaults, visibility);
    table.change_pagination(4, 10);
    table.change_sort(&[ColumnSort::asc("username")]);
    assert_eq!(table.params().page, 1);

    table.change_filters(table.params().clone().with_filter("departmentId", 0));
    let users: Resource<Value> = Resource::new(h.client.clone(), "users");
    let page = users.list(table.params()).await.unwrap();
    let (rows, pagination) = page.into_shared();

    assert_eq!(pagination.total, 1);
    let query = rows[0]["query"].as_str().unwrap();
    assert_eq!(query, "page=1&limit=10&sort=username&order=asc&departmentId=0");

    table.set_rows(Arc::clone(&rows));
    table.set_row_selection([(0usize, true)].into_iter().collect::<std::collections::BTreeMap<_, _>>());
    assert_eq!(table.selected_rows().len(), 1);

    // Same buffer keeps the selection; a refetch drops it
    table.set_rows(Arc::clone(&rows));
    assert_eq!(table.selected_rows().len(), 1);
    let (refetched, _) = users.list(table.params()).await.unwrap().into_shared();
    table.set_rows(refetched);
    assert!(table.row_selection().is_empty());

    // Clearing the sort restores the default ordering
    table.change_sort(&[]);
    assert_eq!(table.params().sort_field(), Some("createdAt"));
    assert_eq!(table.params().order(), Some(SortOrder::Desc));
}
