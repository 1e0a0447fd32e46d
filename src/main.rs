#[macro_use]
extern crate prettytable;

use anyhow::anyhow;
use directories::ProjectDirs;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

mod cli;
mod interface;
mod model;
mod query;
mod storage;
mod store;

use crate::model::TodoUpdate;
use crate::query::Query;
use crate::storage::SqliteStorage;
use crate::store::Store;
use cli::{Command::*, CommandLineArgs, ViewArgs};

fn find_default_db_file() -> Option<PathBuf> {
    let base_dirs = ProjectDirs::from("com", "todomaster", "todomaster")?;
    let root_dir = base_dirs.data_dir();
    if !root_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(root_dir) {
            tracing::error!(dir = %root_dir.display(), error = %e, "failed to create data directory");
            return None;
        }
    }
    Some(root_dir.join("db.sqlite"))
}

/// Log to stderr. RUST_LOG wins over the -v count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn query_for(view: ViewArgs) -> Query {
    Query {
        filter: view.filter,
        search: view.search,
        ..Query::default()
    }
}

fn main() -> anyhow::Result<()> {
    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        db_file,
        verbose,
    } = CommandLineArgs::from_args();

    init_logging(verbose);

    // Unpack the storage file.
    let db_file = db_file
        .or_else(find_default_db_file)
        .ok_or_else(|| anyhow!("Failed to find storage file."))?;
    tracing::debug!(path = %db_file.display(), "opening storage");

    let storage = SqliteStorage::open(&db_file)?;
    let mut store = Store::load(storage)?;

    // Perform the action.
    match action {
        Init { samples } => interface::init(&mut store, samples),
        Add {
            text,
            category,
            priority,
            due,
        } => interface::add_todo(&mut store, text, category, priority, due),
        List { view, sort } => {
            let query = Query {
                sort,
                ..query_for(view)
            };
            interface::list(&store, &query)
        }
        Edit {
            id,
            text,
            category,
            priority,
            due,
            no_due,
        } => {
            let due_date = if no_due { Some(None) } else { due.map(Some) };
            let update = TodoUpdate {
                text,
                category,
                priority,
                due_date,
            };
            interface::edit(&mut store, &id, update)
        }
        Toggle { id } => interface::toggle(&mut store, &id),
        Select { id } => interface::select(&mut store, &id),
        SelectAll { view } => interface::select_all(&mut store, &query_for(view)),
        Rm { id } => interface::remove_todo(&mut store, &id),
        DeleteSelected => interface::delete_selected(&mut store),
        CompleteSelected => interface::complete_selected(&mut store),
        ClearCompleted => interface::clear_completed(&mut store),
        Export { path } => interface::export(&store, path).map(|_| ()),
        Import { path } => interface::import(&mut store, path),
        Theme { theme } => interface::theme(&mut store, theme),
    }?;
    Ok(())
}
