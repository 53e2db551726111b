mod cli;
mod commands;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use dept_admin_client::config::Config;
use dept_admin_client::navigation::{MemoryNavigator, Navigator};
use dept_admin_client::notify::CollectingNotifier;
use dept_admin_client::storage::{Database, KeyValueStore, MemoryStore};
use dept_admin_client::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    // Load configuration; flags win over the environment
    let mut config = Config::load()?;
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.display().to_string();
    }
    config.validate()?;
    info!(base_url = %config.api.base_url, "dept-admin starting");

    // Column layouts and the session survive runs only with a writable data dir
    let store: Arc<dyn KeyValueStore> = match Database::open(&config.storage.data_dir) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            warn!(data_dir = %config.storage.data_dir, error = %e, "Falling back to in-memory state");
            Arc::new(MemoryStore::new())
        }
    };
    let navigator = Arc::new(MemoryNavigator::default());
    let notifier = Arc::new(CollectingNotifier::new());

    let state = AppState::new(config, store, navigator.clone(), notifier.clone())?;

    let result = commands::run(&state, &cli).await;

    for message in notifier.messages() {
        eprintln!("error: {message}");
    }
    if navigator.current_path() == state.config.routes.login_path {
        eprintln!("Session expired. Sign in again with --username.");
    } else if navigator.current_path() == state.config.routes.maintenance_path {
        eprintln!("The service is in maintenance mode. Try again later.");
    }

    result
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
