//! Export downloads: staging, naming and cancellation.

mod common;

use std::path::Path;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::RawQuery;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use common::{spawn_server, Harness};
use dept_admin_client::api::{ApiError, ExportFormat, Resource};
use dept_admin_client::notify::NETWORK_ERROR_MESSAGE;
use dept_admin_client::table::{QueryParams, SortOrder};

fn entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_export_writes_file_with_query() {
    // The body echoes the query string so the test can inspect it
    let app = Router::new().route(
        "/api/users/export",
        get(|RawQuery(query): RawQuery| async move {
            (
                [(header::CONTENT_TYPE, "text/csv")],
                query.unwrap_or_default(),
            )
        }),
    );
    let base = spawn_server(app).await;
    let h = Harness::signed_in(&base);
    let out = TempDir::new().unwrap();

    let users: Resource<Value> = Resource::new(h.client.clone(), "users");
    let params = QueryParams::new(3, 50)
        .with_sort("username", SortOrder::Asc)
        .with_search("ali");
    let path = users
        .export(ExportFormat::Csv, &params, out.path(), &CancellationToken::new())
        .await
        .unwrap();

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("users-"));
    assert!(name.ends_with(".csv"));

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.contains("format=csv"));
    assert!(body.contains("sort=username"));
    assert!(body.contains("search=ali"));
    assert!(!body.contains("page="));
    assert!(!body.contains("limit="));

    assert_eq!(entries(out.path()), vec![name.to_string()]);
}

#[tokio::test]
async fn test_cancelled_export_leaves_nothing_behind() {
    let app = Router::new().route(
        "/api/users/export",
        get(|| async {
            let chunks = stream::unfold(0u32, |n| async move {
                if n >= 100 {
                    return None;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                Some((Ok::<_, std::io::Error>(Bytes::from_static(b"1,alice\n")), n + 1))
            });
            Body::from_stream(chunks)
        }),
    );
    let base = spawn_server(app).await;
    let h = Harness::signed_in(&base);
    let out = TempDir::new().unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let users: Resource<Value> = Resource::new(h.client.clone(), "users");
    let err = users
        .export(ExportFormat::Xlsx, &QueryParams::default(), out.path(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(err.is_handled());
    assert!(h.notifier.messages().is_empty());
    assert!(entries(out.path()).is_empty());
}

#[tokio::test]
async fn test_failed_export_is_reported_and_cleaned_up() {
    let app = Router::new().route(
        "/api/users/export",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "export failed" })),
            )
                .into_response()
        }),
    );
    let base = spawn_server(app).await;
    let h = Harness::signed_in(&base);
    let out = TempDir::new().unwrap();

    let users: Resource<Value> = Resource::new(h.client.clone(), "users");
    let err = users
        .export(ExportFormat::Csv, &QueryParams::default(), out.path(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { .. }));
    assert_eq!(h.notifier.messages().len(), 1);
    assert!(entries(out.path()).is_empty());
}

#[tokio::test]
async fn test_interrupted_export_is_reported_and_cleaned_up() {
    let app = Router::new().route(
        "/api/users/export",
        get(|| async {
            let chunks = stream::iter(vec![
                Ok(Bytes::from_static(b"id,username\n1,alice\n")),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "backend went away",
                )),
            ]);
            Body::from_stream(chunks)
        }),
    );
    let base = spawn_server(app).await;
    let h = Harness::signed_in(&base);
    let out = TempDir::new().unwrap();

    let users: Resource<Value> = Resource::new(h.client.clone(), "users");
    let err = users
        .export(ExportFormat::Csv, &QueryParams::default(), out.path(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(h.notifier.messages(), vec![NETWORK_ERROR_MESSAGE]);
    assert!(entries(out.path()).is_empty());
}
