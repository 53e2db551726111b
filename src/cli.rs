//! Command-line arguments for `dept-admin`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use dept_admin_client::api::ExportFormat;
use dept_admin_client::table::SortOrder;

#[derive(Parser)]
#[command(
    name = "dept-admin",
    version,
    about = "Command-line client for the departmental administration API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// API root (overrides API_BASE_URL).
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Directory for persisted client state (overrides DATA_DIR).
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Sign in as this user before running the command.
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Password for --username.
    #[arg(long, env = "DEPT_ADMIN_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List one page of a resource.
    List(ListArgs),

    /// Show one record by id.
    Show {
        resource: String,
        /// Record id (0 is a valid id).
        id: i64,
    },

    /// Export a resource to CSV or Excel.
    Export(ExportArgs),

    /// Show or change which columns `list` prints for a table, or list stored layouts.
    Columns(ColumnsArgs),

    /// Inspect or toggle maintenance mode.
    Maintenance {
        #[arg(value_enum)]
        action: MaintenanceAction,
        /// Message shown to users while maintenance is on.
        #[arg(long)]
        message: Option<String>,
    },

    /// Print the signed-in user.
    Whoami,

    /// Sign out and clear the stored session.
    Logout,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Free-text search.
    #[arg(long)]
    pub search: Option<String>,

    /// Entity filter as KEY=VALUE (repeatable).
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.filters.is_empty()
    }
}

#[derive(Args)]
pub struct ListArgs {
    pub resource: String,

    #[arg(long)]
    pub page: Option<u32>,

    #[arg(long)]
    pub limit: Option<u32>,

    /// Column to sort by.
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long, value_parser = parse_order, requires = "sort")]
    pub order: Option<SortOrder>,

    /// Go back to the default ordering.
    #[arg(long, conflicts_with = "sort")]
    pub clear_sort: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args)]
pub struct ExportArgs {
    pub resource: String,

    #[arg(long, default_value = "csv", value_parser = parse_format)]
    pub format: ExportFormat,

    /// Output directory.
    #[arg(long = "out", value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args)]
pub struct ColumnsArgs {
    /// Table identity (usually the resource name). Lists stored layouts when omitted.
    pub table: Option<String>,

    #[arg(long, value_name = "COLUMN", requires = "table")]
    pub hide: Vec<String>,

    #[arg(long, value_name = "COLUMN", requires = "table")]
    pub show: Vec<String>,

    /// Forget all stored visibility for the table.
    #[arg(long, requires = "table", conflicts_with_all = ["hide", "show"])]
    pub reset: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MaintenanceAction {
    On,
    Off,
    Status,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty filter name in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_order(raw: &str) -> Result<SortOrder, String> {
    raw.parse()
}

fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    raw.parse()
}
