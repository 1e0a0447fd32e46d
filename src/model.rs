use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a todo. Ids created here are hyphen-less UUIDs,
/// imported ids are kept as they come.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(pub String);

impl TodoId {
    pub fn generate() -> Self {
        TodoId(Uuid::new_v4().simple().to_string())
    }

    /// The first characters of the id, enough to tell todos apart on screen.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personal,
    Work,
    Shopping,
    Health,
    Other,
}

impl Category {
    pub const VARIANTS: &'static [&'static str] = &["personal", "work", "shopping", "health", "other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Other => "other",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Personal
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(Category::Personal),
            "work" => Ok(Category::Work),
            "shopping" => Ok(Category::Shopping),
            "health" => Ok(Category::Health),
            "other" => Ok(Category::Other),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const VARIANTS: &'static [&'static str] = &["low", "medium", "high"];

    /// Sort rank, higher is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// A single todo, saved as an element of the "todos" JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub selected: bool,
}

/// The user supplied fields of a todo about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewTodo {
    pub text: String,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// A partial edit. `None` leaves the field alone; `due_date: Some(None)`
/// clears the deadline.
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TodoUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.category.is_none() && self.priority.is_none() && self.due_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn todo_json_uses_camel_case_and_lowercase_enums() {
        let todo = Todo {
            id: TodoId("1".to_string()),
            text: "Buy milk".to_string(),
            completed: false,
            category: Category::Shopping,
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2026, 10, 20),
            created_at: Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap(),
            selected: false,
        };

        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["category"], "shopping");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["dueDate"], "2026-10-20");
        assert!(json["createdAt"].as_str().unwrap().starts_with("2026-10-16T09:00:00"));
    }

    #[test]
    fn missing_selected_defaults_to_false() {
        let json = r#"{"id":"2","text":"x","completed":true,"category":"work",
            "priority":"low","dueDate":null,"createdAt":"2026-01-01T00:00:00Z"}"#;
        let todo: Todo = serde_json::from_str(json).unwrap();
        assert!(!todo.selected);
        assert!(todo.completed);
        assert_eq!(todo.due_date, None);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Work".parse::<Category>(), Ok(Category::Work));
        assert_eq!(" HIGH ".parse::<Priority>(), Ok(Priority::High));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn short_id_is_a_prefix() {
        let id = TodoId::generate();
        assert_eq!(id.0.len(), 32);
        assert_eq!(id.short().len(), 8);
        assert!(id.0.starts_with(id.short()));
        assert_eq!(TodoId("42".to_string()).short(), "42");
    }
}
