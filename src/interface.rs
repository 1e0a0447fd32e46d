use std::fs;
use std::path::PathBuf;
use std::time::Duration as STDDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use humantime::format_duration;
use prettytable::{format, Cell, Row, Table};

use crate::model::{Category, NewTodo, Priority, Todo, TodoId, TodoUpdate};
use crate::query::{visible, Counters, Query};
use crate::storage::{KeyValueStore, StorageError, THEME_KEY};
use crate::store::{Store, StoreError, StoreResult};

const TEXT_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// The stored theme. Missing or unknown values mean light.
    pub fn load<S: KeyValueStore>(storage: &S) -> Result<Theme, StorageError> {
        Ok(match storage.get(THEME_KEY)?.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        })
    }

    pub fn save<S: KeyValueStore>(self, storage: &mut S) -> Result<(), StorageError> {
        storage.set(THEME_KEY, self.as_str())
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn table_format(self) -> format::TableFormat {
        match self {
            Theme::Light => *format::consts::FORMAT_NO_LINESEP_WITH_TITLE,
            Theme::Dark => *format::consts::FORMAT_BOX_CHARS,
        }
    }
}

/// How pressing a todo's deadline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    None,
    Overdue,
    DueSoon,
    Later,
}

impl DueStatus {
    /// Completed todos are never overdue nor due soon.
    pub fn of(todo: &Todo, today: NaiveDate) -> DueStatus {
        match todo.due_date {
            None => DueStatus::None,
            Some(_) if todo.completed => DueStatus::Later,
            Some(due) if due < today => DueStatus::Overdue,
            Some(due) if due <= today + Duration::days(1) => DueStatus::DueSoon,
            Some(_) => DueStatus::Later,
        }
    }

    fn style(self) -> &'static str {
        match self {
            DueStatus::Overdue => "Fr",
            DueStatus::DueSoon => "Fy",
            DueStatus::None | DueStatus::Later => "",
        }
    }
}

/// "Today", "Tomorrow", "Yesterday", or a short date that only carries the
/// year when it is not the current one.
pub fn due_label(due: NaiveDate, today: NaiveDate) -> String {
    match (due - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ if due.year() == today.year() => due.format("%b %-d").to_string(),
        _ => due.format("%b %-d, %Y").to_string(),
    }
}

/// Time since creation, to the minute.
pub fn age_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    format!("{} ago", format_duration(STDDuration::from_secs(minutes as u64 * 60)))
}

/// Build the table for the shown todos.
pub fn render_table(todos: &[&Todo], theme: Theme, now: DateTime<Utc>, today: NaiveDate) -> Table {
    let mut table = Table::new();
    table.set_format(theme.table_format());
    table.set_titles(row!["id", "done", "todo", "category", "priority", "due", "age", "sel"]);

    for todo in todos {
        let due = todo
            .due_date
            .map(|due| due_label(due, today))
            .unwrap_or_default();
        let priority_style = match todo.priority {
            Priority::High => "Fr",
            Priority::Medium => "",
            Priority::Low => "Fd",
        };

        table.add_row(Row::new(vec![
            Cell::new(todo.id.short()),
            Cell::new(if todo.completed { "x" } else { " " }),
            Cell::new(&textwrap::fill(&todo.text, TEXT_WIDTH)),
            Cell::new(todo.category.as_str()),
            Cell::new(todo.priority.as_str()).style_spec(priority_style),
            Cell::new(&due).style_spec(DueStatus::of(todo, today).style()),
            Cell::new(&age_label(todo.created_at, now)),
            Cell::new(if todo.selected { "*" } else { "" }),
        ]));
    }
    table
}

/// Print the outcome of a rejected user action, like an inline form
/// error. Storage failures are still errors.
fn rejected<T>(result: StoreResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::Storage(e)) => Err(e).context("Failed to write todos to storage."),
        Err(e) => {
            tracing::debug!(error = %e, "action rejected");
            println!("{}", e);
            Ok(None)
        }
    }
}

fn resolve<S: KeyValueStore>(store: &Store<S>, reference: &str) -> Result<Option<TodoId>> {
    rejected(store.resolve(reference))
}

pub fn init<S: KeyValueStore>(store: &mut Store<S>, samples: bool) -> Result<()> {
    if samples {
        if store.todos().is_empty() {
            store
                .replace_all(sample_todos(Utc::now(), Local::now().date_naive()))
                .context("Failed to store sample todos.")?;
            println!("Added {} sample todos.", store.todos().len());
        } else {
            println!("The list is not empty, no samples added.");
        }
    } else {
        store.persist().context("Failed to initialize storage.")?;
        println!("Ready.");
    }
    Ok(())
}

pub fn add_todo<S: KeyValueStore>(
    store: &mut Store<S>,
    text: String,
    category: Category,
    priority: Priority,
    due_date: Option<NaiveDate>,
) -> Result<()> {
    let new = NewTodo {
        text,
        category,
        priority,
        due_date,
    };
    if let Some(todo) = rejected(store.add(new))? {
        println!("{}. {} [{}, {}]", todo.id.short(), todo.text, todo.category, todo.priority);
    }
    Ok(())
}

pub fn list<S: KeyValueStore>(store: &Store<S>, query: &Query) -> Result<()> {
    let theme = Theme::load(store.storage()).context("Failed to read theme from storage.")?;
    let shown = visible(store.todos(), query);

    if shown.is_empty() {
        if store.todos().is_empty() {
            println!("No todos yet. Use 'todomaster add' to add one.");
        } else {
            println!("No todos match.");
        }
    } else {
        render_table(&shown, theme, Utc::now(), Local::now().date_naive()).printstd();
    }

    println!("{}", Counters::of(store.todos()));
    let selected = store.todos().iter().filter(|t| t.selected).count();
    if selected > 0 {
        println!(
            "{} selected: use delete-selected or complete-selected.",
            selected
        );
    }
    Ok(())
}

pub fn edit<S: KeyValueStore>(store: &mut Store<S>, id: &str, update: TodoUpdate) -> Result<()> {
    let id = match resolve(store, id)? {
        Some(id) => id,
        None => return Ok(()),
    };
    if update.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    if let Some(todo) = rejected(store.update(&id, update))? {
        println!("{}. {}", todo.id.short(), todo.text);
    }
    Ok(())
}

pub fn toggle<S: KeyValueStore>(store: &mut Store<S>, id: &str) -> Result<()> {
    if let Some(id) = resolve(store, id)? {
        if let Some(completed) = rejected(store.toggle_completed(&id))? {
            println!("{} {}.", id.short(), if completed { "completed" } else { "active" });
        }
    }
    Ok(())
}

pub fn select<S: KeyValueStore>(store: &mut Store<S>, id: &str) -> Result<()> {
    if let Some(id) = resolve(store, id)? {
        if let Some(selected) = rejected(store.toggle_selected(&id))? {
            println!("{} {}.", id.short(), if selected { "selected" } else { "deselected" });
        }
    }
    Ok(())
}

pub fn select_all<S: KeyValueStore>(store: &mut Store<S>, query: &Query) -> Result<()> {
    let ids: Vec<TodoId> = visible(store.todos(), query)
        .into_iter()
        .map(|t| t.id.clone())
        .collect();
    if ids.is_empty() {
        println!("No todos match.");
        return Ok(());
    }
    if let Some(selected) = rejected(store.select_all(&ids))? {
        println!(
            "{} {} todos.",
            if selected { "Selected" } else { "Deselected" },
            ids.len()
        );
    }
    Ok(())
}

pub fn remove_todo<S: KeyValueStore>(store: &mut Store<S>, id: &str) -> Result<()> {
    if let Some(id) = resolve(store, id)? {
        if let Some(todo) = rejected(store.remove(&id))? {
            println!("Removed: {}", todo.text);
        }
    }
    Ok(())
}

pub fn delete_selected<S: KeyValueStore>(store: &mut Store<S>) -> Result<()> {
    if !store.todos().iter().any(|t| t.selected) {
        println!("No todos selected.");
        return Ok(());
    }
    if let Some(removed) = rejected(store.remove_where(|t| t.selected))? {
        println!("Removed {} selected todos.", removed);
    }
    Ok(())
}

pub fn complete_selected<S: KeyValueStore>(store: &mut Store<S>) -> Result<()> {
    if !store.todos().iter().any(|t| t.selected) {
        println!("No todos selected.");
        return Ok(());
    }
    if let Some(completed) = rejected(store.set_completed_where(|t| t.selected))? {
        println!("Completed {} todos.", completed);
    }
    Ok(())
}

pub fn clear_completed<S: KeyValueStore>(store: &mut Store<S>) -> Result<()> {
    if !store.todos().iter().any(|t| t.completed) {
        println!("No completed todos.");
        return Ok(());
    }
    if let Some(removed) = rejected(store.remove_where(|t| t.completed))? {
        println!("Removed {} completed todos.", removed);
    }
    Ok(())
}

pub fn default_export_path(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("todos-{}.json", today.format("%Y-%m-%d")))
}

pub fn export<S: KeyValueStore>(store: &Store<S>, path: Option<PathBuf>) -> Result<PathBuf> {
    let path = path.unwrap_or_else(|| default_export_path(Local::now().date_naive()));
    let json = serde_json::to_string_pretty(store.todos()).context("Failed to serialize todos.")?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}.", path.display()))?;
    tracing::info!(path = %path.display(), count = store.todos().len(), "exported todos");
    println!("Exported {} todos to {}.", store.todos().len(), path.display());
    Ok(path)
}

/// Replace every todo with the ones in `path`. An unreadable or invalid file
/// changes nothing.
pub fn import<S: KeyValueStore>(store: &mut Store<S>, path: PathBuf) -> Result<()> {
    let json = fs::read_to_string(&path).with_context(|| format!("Failed to read {}.", path.display()))?;
    let todos = match crate::store::parse_todos(&json) {
        Ok(todos) => todos,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "import rejected");
            println!("Invalid file format: {}", e);
            return Ok(());
        }
    };
    if rejected(store.replace_all(todos))?.is_some() {
        println!("Imported {} todos.", store.todos().len());
    }
    Ok(())
}

pub fn theme<S: KeyValueStore>(store: &mut Store<S>, value: Option<String>) -> Result<()> {
    let current = Theme::load(store.storage()).context("Failed to read theme from storage.")?;
    let next = match value.as_deref() {
        Some("dark") => Theme::Dark,
        Some("light") => Theme::Light,
        Some(other) => {
            println!("Unknown theme '{}'.", other);
            return Ok(());
        }
        None => current.toggled(),
    };
    next.save(store.storage_mut()).context("Failed to write theme to storage.")?;
    println!("Theme: {}", next.as_str());
    Ok(())
}

/// The welcome todos offered on an empty list.
pub fn sample_todos(now: DateTime<Utc>, today: NaiveDate) -> Vec<Todo> {
    let sample = |id: &str, text: &str, category, priority, due_date, hours_ago, completed| Todo {
        id: TodoId(id.to_string()),
        text: text.to_string(),
        completed,
        category,
        priority,
        due_date,
        created_at: now - Duration::hours(hours_ago),
        selected: false,
    };
    vec![
        sample(
            "1",
            "Welcome to todomaster! This is a sample todo.",
            Category::Personal,
            Priority::Medium,
            Some(today + Duration::days(1)),
            0,
            false,
        ),
        sample(
            "2",
            "Try editing this todo with 'todomaster edit 2 --text ...'.",
            Category::Work,
            Priority::High,
            None,
            1,
            false,
        ),
        sample(
            "3",
            "Mark todos as complete with 'todomaster toggle <id>'.",
            Category::Personal,
            Priority::Low,
            None,
            2,
            true,
        ),
    ]
}
