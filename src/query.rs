//! Turns the stored list into the list shown to the user: status filter,
//! text search, then a stable sort.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use feruca::Collator;

use crate::model::Todo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    Active,
    Completed,
}

impl Filter {
    pub const VARIANTS: &'static [&'static str] = &["all", "active", "completed"];

    pub fn keeps(&self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        })
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Created,
    DueDate,
    Priority,
    Alphabetical,
}

impl SortKey {
    pub fn compare(&self, a: &Todo, b: &Todo, collator: &mut Collator) -> Ordering {
        match self {
            SortKey::Created => b.created_at.cmp(&a.created_at),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
            SortKey::Alphabetical => collator.collate(&a.text, &b.text),
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Created
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            SortKey::Created => "created",
            SortKey::DueDate => "due-date",
            SortKey::Priority => "priority",
            SortKey::Alphabetical => "alphabetical",
        })
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" => Ok(SortKey::Created),
            "duedate" | "due-date" | "due" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "alphabetical" | "alpha" => Ok(SortKey::Alphabetical),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

/// Everything that decides what the list view shows.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Filter,
    pub search: String,
    pub sort: SortKey,
}

impl Query {
    pub fn matches(&self, todo: &Todo) -> bool {
        self.filter.keeps(todo) && matches_search(todo, &self.search)
    }
}

fn matches_search(todo: &Todo, term: &str) -> bool {
    term.is_empty() || todo.text.to_lowercase().contains(&term.to_lowercase())
}

/// Filter, search and sort `todos`. The sort is stable, so todos that tie on
/// the sort key keep their stored order. Text is ordered with the Unicode
/// collation algorithm (CLDR root), lower case before upper case.
pub fn visible<'a>(todos: &'a [Todo], query: &Query) -> Vec<&'a Todo> {
    let mut shown: Vec<&Todo> = todos.iter().filter(|todo| query.matches(todo)).collect();
    let mut collator = Collator::default();
    shown.sort_by(|a, b| query.sort.compare(a, b, &mut collator));
    shown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Counters {
    pub fn of(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count();
        Counters {
            total: todos.len(),
            active: todos.len() - completed,
            completed,
        }
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} total · {} active · {} completed",
            self.total, self.active, self.completed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Priority, TodoId};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn todo(id: &str, text: &str) -> Todo {
        Todo {
            id: TodoId(id.to_string()),
            text: text.to_string(),
            completed: false,
            category: Category::Personal,
            priority: Priority::Medium,
            due_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
            selected: false,
        }
    }

    fn ids(todos: &[&Todo]) -> Vec<String> {
        todos.iter().map(|t| t.id.0.clone()).collect()
    }

    fn sorted(todos: &[Todo], sort: SortKey) -> Vec<String> {
        let query = Query {
            sort,
            ..Query::default()
        };
        ids(&visible(todos, &query))
    }

    #[test]
    fn active_filter_never_returns_completed() {
        let mut todos = vec![todo("1", "a"), todo("2", "b"), todo("3", "c")];
        todos[1].completed = true;

        let query = Query {
            filter: Filter::Active,
            ..Query::default()
        };
        let shown = visible(&todos, &query);
        assert!(shown.iter().all(|t| !t.completed));
        assert_eq!(ids(&shown), vec!["1", "3"]);

        let query = Query {
            filter: Filter::Completed,
            ..Query::default()
        };
        assert_eq!(ids(&visible(&todos, &query)), vec!["2"]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let todos = vec![todo("1", "Buy Milk"), todo("2", "Walk the dog")];
        let query = Query {
            search: "milk".to_string(),
            ..Query::default()
        };
        assert_eq!(ids(&visible(&todos, &query)), vec!["1"]);

        let query = Query {
            search: String::new(),
            ..Query::default()
        };
        assert_eq!(visible(&todos, &query).len(), 2);
    }

    #[test]
    fn search_term_whitespace_is_significant() {
        let todos = vec![todo("1", "buy milk"), todo("2", "milkshake")];
        let query = Query {
            search: " milk".to_string(),
            ..Query::default()
        };
        assert_eq!(ids(&visible(&todos, &query)), vec!["1"]);
    }

    #[test]
    fn created_sorts_newest_first() {
        let mut todos = vec![todo("old", "a"), todo("new", "b"), todo("mid", "c")];
        let base = todos[0].created_at;
        todos[1].created_at = base + Duration::hours(2);
        todos[2].created_at = base + Duration::hours(1);
        assert_eq!(sorted(&todos, SortKey::Created), vec!["new", "mid", "old"]);
    }

    #[test]
    fn undated_todos_sort_after_dated_ones() {
        let mut todos = vec![
            todo("none1", "a"),
            todo("late", "b"),
            todo("none2", "c"),
            todo("early", "d"),
            todo("mid", "e"),
        ];
        todos[1].due_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        todos[3].due_date = NaiveDate::from_ymd_opt(2026, 10, 1);
        todos[4].due_date = NaiveDate::from_ymd_opt(2026, 11, 1);

        let query = Query {
            sort: SortKey::DueDate,
            ..Query::default()
        };
        let shown = visible(&todos, &query);
        assert_eq!(ids(&shown), vec!["early", "mid", "late", "none1", "none2"]);

        let dates: Vec<_> = shown.iter().filter_map(|t| t.due_date).collect();
        assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn priority_sort_is_stable() {
        let mut todos = vec![todo("low", "a"), todo("high1", "b"), todo("medium", "c"), todo("high2", "d")];
        todos[0].priority = Priority::Low;
        todos[1].priority = Priority::High;
        todos[2].priority = Priority::Medium;
        todos[3].priority = Priority::High;

        assert_eq!(
            sorted(&todos, SortKey::Priority),
            vec!["high1", "high2", "medium", "low"]
        );
    }

    #[test]
    fn alphabetical_ignores_case_first() {
        let todos = vec![
            todo("1", "banana"),
            todo("2", "Apple"),
            todo("3", "apple"),
            todo("4", "Cherry"),
        ];
        assert_eq!(sorted(&todos, SortKey::Alphabetical), vec!["3", "2", "1", "4"]);
    }

    #[test]
    fn alphabetical_places_accented_letters_with_their_base() {
        let todos = vec![todo("z", "zebra"), todo("e", "Éclair"), todo("f", "fig")];
        assert_eq!(sorted(&todos, SortKey::Alphabetical), vec!["e", "f", "z"]);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let todos = vec![todo("1", "x"), todo("2", "y")];
        let query = Query {
            sort: SortKey::Alphabetical,
            ..Query::default()
        };
        assert_eq!(ids(&visible(&todos, &query)), ids(&visible(&todos, &query)));
    }

    #[test]
    fn counters_split_active_and_completed() {
        let mut todos = vec![todo("1", "a"), todo("2", "b"), todo("3", "c")];
        todos[0].completed = true;
        assert_eq!(
            Counters::of(&todos),
            Counters {
                total: 3,
                active: 2,
                completed: 1
            }
        );
        assert_eq!(Counters::of(&[]), Counters::default());
    }

    #[test]
    fn sort_keys_parse_both_spellings() {
        assert_eq!("dueDate".parse::<SortKey>(), Ok(SortKey::DueDate));
        assert_eq!("due-date".parse::<SortKey>(), Ok(SortKey::DueDate));
        assert!("size".parse::<SortKey>().is_err());
    }
}
