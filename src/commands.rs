//! Subcommand implementations for `dept-admin`.

use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{Cli, ColumnsArgs, Command, ExportArgs, FilterArgs, ListArgs, MaintenanceAction};
use dept_admin_client::api::resources::KNOWN_RESOURCES;
use dept_admin_client::api::ApiError;
use dept_admin_client::table::{
    ColumnSort, ColumnVisibility, QueryParams, SortOrder, StateUpdate, TableController,
};
use dept_admin_client::AppState;

pub async fn run(state: &AppState, cli: &Cli) -> anyhow::Result<()> {
    if let Some(username) = &cli.username {
        let Some(password) = &cli.password else {
            bail!("--username needs a password (set DEPT_ADMIN_PASSWORD)");
        };
        let user = state
            .auth()
            .login(username, password)
            .await
            .map_err(describe)?;
        eprintln!("Signed in as {} ({})", user.username, user.role);
    }

    match &cli.command {
        Command::List(args) => list(state, args).await,
        Command::Show { resource, id } => show(state, resource, *id).await,
        Command::Export(args) => export(state, args).await,
        Command::Columns(args) => columns(state, args),
        Command::Maintenance { action, message } => {
            maintenance(state, *action, message.as_deref()).await
        }
        Command::Whoami => whoami(state).await,
        Command::Logout => logout(state).await,
    }
}

fn check_resource(resource: &str) -> anyhow::Result<()> {
    if !KNOWN_RESOURCES.contains(&resource) {
        bail!(
            "unknown resource '{resource}' (expected one of: {})",
            KNOWN_RESOURCES.join(", ")
        );
    }
    Ok(())
}

/// Default list state: first page, newest first
fn default_params() -> QueryParams {
    QueryParams::default().with_sort("createdAt", SortOrder::Desc)
}

fn filtered_params(base: QueryParams, filter: &FilterArgs) -> QueryParams {
    let mut params = QueryParams {
        filters: Default::default(),
        search: None,
        ..base
    };
    if let Some(search) = &filter.search {
        params = params.with_search(search.clone());
    }
    for (key, value) in &filter.filters {
        params = params.with_filter(key.clone(), filter_value(value));
    }
    params
}

/// Numbers and booleans go out as JSON scalars, the rest as strings
fn filter_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

async fn list(state: &AppState, args: &ListArgs) -> anyhow::Result<()> {
    check_resource(&args.resource)?;
    let mut table: TableController<Value> = state.table(&args.resource, default_params());

    if !args.filter.is_empty() {
        table.change_filters(filtered_params(table.params().clone(), &args.filter));
    }
    if let Some(field) = &args.sort {
        let sort = match args.order.unwrap_or(SortOrder::Asc) {
            SortOrder::Asc => ColumnSort::asc(field.clone()),
            SortOrder::Desc => ColumnSort::desc(field.clone()),
        };
        table.change_sort(&[sort]);
    } else if args.clear_sort {
        table.change_sort(&[]);
    }
    if args.page.is_some() || args.limit.is_some() {
        let page = args.page.unwrap_or(table.params().page);
        let limit = args.limit.unwrap_or(table.params().limit);
        table.change_pagination(page, limit);
    }
    debug!(table = %table.identity(), params = ?table.params(), "Listing");

    let page = state
        .resource::<Value>(&args.resource)
        .list(table.params())
        .await
        .map_err(describe)?;
    let (rows, pagination) = page.into_shared();
    table.set_rows(Arc::clone(&rows));

    for row in rows.iter() {
        println!("{}", visible_columns(&table, row));
    }
    eprintln!(
        "page {}/{} ({} total, {} per page)",
        pagination.page, pagination.total_pages, pagination.total, pagination.limit
    );
    Ok(())
}

/// Drop the fields hidden for this table
fn visible_columns(table: &TableController<Value>, row: &Value) -> Value {
    match row {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(column, _)| table.is_column_visible(column))
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

async fn show(state: &AppState, resource: &str, id: i64) -> anyhow::Result<()> {
    check_resource(resource)?;
    let record: Value = state
        .resource::<Value>(resource)
        .detail(id)
        .await
        .map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn export(state: &AppState, args: &ExportArgs) -> anyhow::Result<()> {
    check_resource(&args.resource)?;
    let params = filtered_params(default_params(), &args.filter);

    let cancel = CancellationToken::new();
    let signal = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = state
        .resource::<Value>(&args.resource)
        .export(args.format, &params, &args.out_dir, &cancel)
        .await;
    signal.abort();

    match result {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(ApiError::Cancelled) => {
            eprintln!("Export cancelled");
            Ok(())
        }
        Err(e) => Err(describe(e)),
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, cancelling download");
    token.cancel();
}

fn columns(state: &AppState, args: &ColumnsArgs) -> anyhow::Result<()> {
    let Some(name) = args.table.as_deref() else {
        let tables = state
            .visibility
            .tables()
            .context("listing stored column layouts")?;
        for table in tables {
            println!("{table}");
        }
        return Ok(());
    };

    if args.reset {
        let existed = state
            .visibility
            .clear(name)
            .with_context(|| format!("clearing column visibility for '{name}'"))?;
        if existed {
            eprintln!("Column visibility for '{name}' reset");
        }
        return Ok(());
    }

    let mut table: TableController<Value> = state.table(name, QueryParams::default());
    if !args.hide.is_empty() || !args.show.is_empty() {
        let hide = args.hide.clone();
        let show = args.show.clone();
        table.set_column_visibility(StateUpdate::update(move |prev: &ColumnVisibility| {
            let mut next = prev.clone();
            for column in hide {
                next.insert(column, false);
            }
            for column in show {
                next.insert(column, true);
            }
            next
        }));
    }

    for (column, visible) in table.column_visibility() {
        println!("{column}\t{}", if *visible { "shown" } else { "hidden" });
    }
    Ok(())
}

async fn maintenance(
    state: &AppState,
    action: MaintenanceAction,
    message: Option<&str>,
) -> anyhow::Result<()> {
    let settings = state.settings();
    let current = match action {
        MaintenanceAction::Status => settings.get().await,
        MaintenanceAction::On => settings.set_maintenance(true, message).await,
        MaintenanceAction::Off => settings.set_maintenance(false, message).await,
    }
    .map_err(describe)?;

    let mode = if current.maintenance_mode { "on" } else { "off" };
    match current.maintenance_message.as_deref() {
        Some(text) if current.maintenance_mode => println!("maintenance: {mode} ({text})"),
        _ => println!("maintenance: {mode}"),
    }
    Ok(())
}

async fn whoami(state: &AppState) -> anyhow::Result<()> {
    if !state.session.is_authenticated() {
        bail!("not signed in");
    }
    let user = state.auth().me().await.map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

async fn logout(state: &AppState) -> anyhow::Result<()> {
    if !state.session.is_authenticated() {
        eprintln!("Not signed in");
        return Ok(());
    }
    state.auth().logout().await.map_err(describe)?;
    eprintln!("Signed out");
    Ok(())
}

/// Errors the pipeline already surfaced (redirect or notification) are not
/// repeated in detail.
fn describe(error: ApiError) -> anyhow::Error {
    if error.is_handled() {
        anyhow::anyhow!("request failed")
    } else {
        anyhow::Error::new(error)
    }
}
