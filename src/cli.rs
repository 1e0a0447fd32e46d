use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate};
use structopt::StructOpt;

use crate::model::{Category, Priority};
use crate::query::{Filter, SortKey};

/// Parse a due date: `today`, `tomorrow` or `YYYY-MM-DD`.
pub fn parse_due_date(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("'{}' is not a date, use YYYY-MM-DD, today or tomorrow", other)),
    }
}

#[derive(Debug, StructOpt)]
pub struct ViewArgs {
    /// Which todos to show: all, active or completed.
    #[structopt(short, long, default_value = "all", possible_values = Filter::VARIANTS, case_insensitive = true)]
    pub filter: Filter,

    /// Only show todos whose text contains this (case-insensitive).
    #[structopt(short, long, default_value = "")]
    pub search: String,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Create the storage file, optionally with a few sample todos.
    Init {
        /// Add the welcome todos if the list is empty.
        #[structopt(long)]
        samples: bool,
    },
    /// Add a new todo.
    Add {
        /// The todo text.
        #[structopt()]
        text: String,

        #[structopt(short, long, default_value = "personal", possible_values = Category::VARIANTS, case_insensitive = true)]
        category: Category,

        #[structopt(short, long, default_value = "medium", possible_values = Priority::VARIANTS, case_insensitive = true)]
        priority: Priority,

        /// Due date (YYYY-MM-DD, today or tomorrow).
        #[structopt(short, long, parse(try_from_str = parse_due_date))]
        due: Option<NaiveDate>,
    },
    /// List todos.
    List {
        #[structopt(flatten)]
        view: ViewArgs,

        /// Sort by created, due-date, priority or alphabetical.
        #[structopt(short = "o", long, default_value = "created")]
        sort: SortKey,
    },
    /// Change the text, category, priority or due date of a todo.
    Edit {
        /// Id (or unique id prefix) of the todo.
        id: String,

        #[structopt(short, long)]
        text: Option<String>,

        #[structopt(short, long, possible_values = Category::VARIANTS, case_insensitive = true)]
        category: Option<Category>,

        #[structopt(short, long, possible_values = Priority::VARIANTS, case_insensitive = true)]
        priority: Option<Priority>,

        #[structopt(short, long, parse(try_from_str = parse_due_date), conflicts_with = "no-due")]
        due: Option<NaiveDate>,

        /// Remove the due date.
        #[structopt(long)]
        no_due: bool,
    },
    /// Mark a todo as completed, or as active again.
    Toggle { id: String },
    /// Select or deselect a todo for bulk actions.
    Select { id: String },
    /// Select every shown todo, or deselect them if all are selected.
    SelectAll {
        #[structopt(flatten)]
        view: ViewArgs,
    },
    /// Remove a todo.
    Rm { id: String },
    /// Remove every selected todo.
    DeleteSelected,
    /// Mark every selected todo as completed.
    CompleteSelected,
    /// Remove every completed todo.
    ClearCompleted,
    /// Write all todos to a JSON file.
    Export {
        /// Defaults to todos-<today>.json in the current directory.
        #[structopt(parse(from_os_str))]
        path: Option<PathBuf>,
    },
    /// Replace all todos with the ones in a JSON file.
    Import {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    /// Set the theme, or toggle it with no argument.
    Theme {
        #[structopt(possible_values = &["light", "dark"])]
        theme: Option<String>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(name = "todomaster", about = "A todo list for the command line.")]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different storage file.
    #[structopt(parse(from_os_str), long, env = "TODOMASTER_DB")]
    pub db_file: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[structopt(short, long, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_dates_accept_iso_and_relative_days() {
        assert_eq!(parse_due_date("2026-10-20"), Ok(NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()));
        let today = Local::now().date_naive();
        assert_eq!(parse_due_date("Tomorrow"), Ok(today + Duration::days(1)));
        assert!(parse_due_date("20/10/2026").is_err());
    }

    #[test]
    fn add_uses_defaults() {
        let args = CommandLineArgs::from_iter(&["todomaster", "add", "Buy milk"]);
        match args.action {
            Command::Add {
                text,
                category,
                priority,
                due,
            } => {
                assert_eq!(text, "Buy milk");
                assert_eq!(category, Category::Personal);
                assert_eq!(priority, Priority::Medium);
                assert_eq!(due, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn list_parses_view_options() {
        let args = CommandLineArgs::from_iter(&["todomaster", "list", "-f", "active", "-s", "milk", "-o", "due-date"]);
        match args.action {
            Command::List { view, sort } => {
                assert_eq!(view.filter, Filter::Active);
                assert_eq!(view.search, "milk");
                assert_eq!(sort, SortKey::DueDate);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn verbose_is_accepted_after_the_subcommand() {
        let args = CommandLineArgs::from_iter_safe(&["todomaster", "list", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);
        assert!(matches!(args.action, Command::List { .. }));
    }

    #[test]
    fn theme_value_is_optional() {
        let args = CommandLineArgs::from_iter(&["todomaster", "theme"]);
        assert!(matches!(args.action, Command::Theme { theme: None }));
        assert!(CommandLineArgs::from_iter_safe(&["todomaster", "theme", "sepia"]).is_err());
    }
}
