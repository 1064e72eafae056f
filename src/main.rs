use std::env;
use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use skcstore::cli::{Cli, Command};
use skcstore::config::Config;
use skcstore::engine::Engine;
use skcstore::export;
use skcstore::model::Candidate;
use skcstore::report;
use skcstore::storage::SqliteBackend;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SKCSTORE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "skcstore=debug,info" } else { "skcstore=info,warn" })
    });

    let format = env::var("SKCSTORE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // logs go to stderr so exports and id lists on stdout stay clean
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false).with_writer(io::stderr)).init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(io::stderr)).init();
        }
    }
}

fn read_candidates(file: Option<&std::path::Path>) -> Result<Vec<Candidate>> {
    let source = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
            buf
        }
    };

    serde_json::from_str(&source).context("expected a JSON array of candidates")
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(&cli)?;
    init_tracing(config.verbose);

    let backend = match &config.db_path {
        Some(path) => SqliteBackend::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => SqliteBackend::open_default().context("failed to open database")?,
    };
    let engine = Engine::with_options(backend, config.engine_options());
    let tenant = config.tenant.as_str();

    match cli.command {
        Command::Collect(args) => {
            let candidates = read_candidates(args.file.as_deref())?;
            let outcome = engine.insert_records(tenant, &candidates)
                .context("operation failed: could not save collected records")?;

            println!(
                "collected {} of {} submitted ({} already present)",
                outcome.inserted, outcome.submitted, outcome.skipped
            );
        }
        Command::List(args) => {
            let loaded = engine.load_detailed(tenant);
            if loaded.origin.is_default() && config.verbose {
                eprintln!("note: showing empty state ({:?})", loaded.origin);
            }
            report::print(&loaded.snapshot, args.json);
        }
        Command::Show(args) => {
            match engine.category(tenant, args.cat_id) {
                Some(category) => print!("{}", report::table::render_category(&category)),
                None => {
                    eprintln!("Category {} not found for tenant '{tenant}'.", args.cat_id);
                    std::process::exit(1);
                }
            }
        }
        Command::Delete(args) => {
            if engine.delete_category(tenant, args.cat_id)
                .context("operation failed: could not delete category")?
            {
                println!("deleted category {}", args.cat_id);
            } else {
                eprintln!("Category {} not found for tenant '{tenant}'.", args.cat_id);
                std::process::exit(1);
            }
        }
        Command::Clear => {
            engine.clear_tenant(tenant).context("operation failed: could not clear records")?;
            println!("cleared all records for tenant '{tenant}'");
        }
        Command::Ids(args) => {
            let ids = engine.skc_ids(tenant, args.category);
            if ids.is_empty() {
                eprintln!("No SKC ids to copy.");
            } else {
                println!("{}", export::join_ids(&ids));
            }
        }
        Command::Export(args) => {
            let snapshot = engine.load(tenant);
            let csv = if args.bom {
                export::to_csv_with_bom(&snapshot)?
            } else {
                export::to_csv(&snapshot)?
            };

            let output = if args.dated {
                Some(export::default_export_file_name(chrono::Utc::now().date_naive()).into())
            } else {
                args.output
            };

            match output {
                Some(path) => {
                    fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!(
                        "exported {} records to {}",
                        snapshot.global_stats.total_skc_count,
                        path.display()
                    );
                }
                None => print!("{csv}"),
            }
        }
        Command::Tenants => {
            let keys = engine.list_tenant_keys()?;
            if keys.is_empty() {
                println!("No tenant data stored.");
            }
            for key in keys {
                println!("{key}");
            }
        }
        Command::Switch(args) => {
            let purged = engine.purge_other_tenants(&args.tenant)?;
            println!("kept tenant '{}', removed {purged} other tenant(s)", args.tenant);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
