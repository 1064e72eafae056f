use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skcstore")]
#[command(about = "Per-tenant store for unpublished catalog items")]
#[command(version)]
pub struct Cli {
    /// Tenant to operate on (defaults to the anonymous tenant)
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a batch of candidates read from a JSON array
    Collect(CollectArgs),

    /// Show all categories and totals
    List(ListArgs),

    /// Show the records of one category
    Show(CategoryArgs),

    /// Delete a category and its records
    Delete(CategoryArgs),

    /// Remove everything stored for the tenant
    Clear,

    /// Print collected SKC ids, one per line
    Ids(IdsArgs),

    /// Export all records as CSV
    Export(ExportArgs),

    /// List every tenant key in the store
    Tenants,

    /// Keep only the given tenant's data, removing every other tenant
    Switch(SwitchArgs),
}

#[derive(Parser)]
pub struct CollectArgs {
    /// JSON file with an array of candidates (reads stdin when omitted)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Output the stored snapshot as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct CategoryArgs {
    /// Category id
    pub cat_id: i64,
}

#[derive(Parser)]
pub struct IdsArgs {
    /// Only ids from this category
    #[arg(long)]
    pub category: Option<i64>,
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write to a dated file name in the current directory
    #[arg(long, default_value_t = false, conflicts_with = "output")]
    pub dated: bool,

    /// Prefix a UTF-8 byte order mark for spreadsheet tools
    #[arg(long, default_value_t = false)]
    pub bom: bool,
}

#[derive(Parser)]
pub struct SwitchArgs {
    /// Tenant whose data is kept
    pub tenant: String,
}
