use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{NewTodo, Todo, TodoId, TodoUpdate};
use crate::storage::{KeyValueStore, StorageError, TODOS_KEY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("no todo with id '{0}'")]
    NotFound(TodoId),
    #[error("'{0}' matches more than one todo, type more of the id")]
    AmbiguousId(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The ordered list of todos, newest first. Mutations here never touch
/// storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoList {
    todos: Vec<Todo>,
}

impl TodoList {
    pub fn new(todos: Vec<Todo>) -> Self {
        TodoList { todos }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    fn get_mut(&mut self, id: &TodoId) -> StoreResult<&mut Todo> {
        self.todos
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Find the todo a user typed id refers to: an exact id, or else a
    /// prefix shared by exactly one id.
    pub fn resolve(&self, reference: &str) -> StoreResult<TodoId> {
        let reference = reference.trim();
        if let Some(todo) = self.todos.iter().find(|t| t.id.0 == reference) {
            return Ok(todo.id.clone());
        }

        let mut candidates = self
            .todos
            .iter()
            .filter(|t| !reference.is_empty() && t.id.0.starts_with(reference));
        match (candidates.next(), candidates.next()) {
            (Some(todo), None) => Ok(todo.id.clone()),
            (Some(_), Some(_)) => Err(StoreError::AmbiguousId(reference.to_string())),
            (None, _) => Err(StoreError::NotFound(TodoId(reference.to_string()))),
        }
    }

    /// Create a todo and put it at the front of the list.
    pub fn add(&mut self, new: NewTodo, created_at: DateTime<Utc>) -> StoreResult<&Todo> {
        let text = validated_text(&new.text)?;
        let todo = Todo {
            id: TodoId::generate(),
            text,
            completed: false,
            category: new.category,
            priority: new.priority,
            due_date: new.due_date,
            created_at,
            selected: false,
        };
        self.todos.insert(0, todo);
        Ok(&self.todos[0])
    }

    pub fn update(&mut self, id: &TodoId, update: TodoUpdate) -> StoreResult<&Todo> {
        let text = match &update.text {
            Some(text) => Some(validated_text(text)?),
            None => None,
        };

        let todo = self.get_mut(id)?;
        if let Some(text) = text {
            todo.text = text;
        }
        if let Some(category) = update.category {
            todo.category = category;
        }
        if let Some(priority) = update.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            todo.due_date = due_date;
        }
        Ok(&*todo)
    }

    /// Flip the completed flag, returning the new value.
    pub fn toggle_completed(&mut self, id: &TodoId) -> StoreResult<bool> {
        let todo = self.get_mut(id)?;
        todo.completed = !todo.completed;
        Ok(todo.completed)
    }

    /// Flip the selected flag, returning the new value.
    pub fn toggle_selected(&mut self, id: &TodoId) -> StoreResult<bool> {
        let todo = self.get_mut(id)?;
        todo.selected = !todo.selected;
        Ok(todo.selected)
    }

    /// Select every listed todo, or deselect them all if they already are.
    /// Returns whether the todos end up selected.
    pub fn select_all(&mut self, ids: &[TodoId]) -> bool {
        let ids: HashSet<&TodoId> = ids.iter().collect();
        let all_selected = self
            .todos
            .iter()
            .filter(|t| ids.contains(&t.id))
            .all(|t| t.selected);

        for todo in self.todos.iter_mut().filter(|t| ids.contains(&t.id)) {
            todo.selected = !all_selected;
        }
        !all_selected
    }

    pub fn remove(&mut self, id: &TodoId) -> StoreResult<Todo> {
        let position = self
            .todos
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(self.todos.remove(position))
    }

    /// Remove every todo matching `predicate`, returning how many went.
    pub fn remove_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&Todo) -> bool,
    {
        let before = self.todos.len();
        self.todos.retain(|t| !predicate(t));
        before - self.todos.len()
    }

    /// Mark every todo matching `predicate` as completed and deselect it.
    pub fn set_completed_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&Todo) -> bool,
    {
        let mut changed = 0;
        for todo in self.todos.iter_mut().filter(|t| predicate(t)) {
            todo.completed = true;
            todo.selected = false;
            changed += 1;
        }
        changed
    }

    /// Replace the whole list. Nothing changes unless every record is valid.
    pub fn replace_all(&mut self, todos: Vec<Todo>) -> StoreResult<()> {
        validate_all(&todos)?;
        self.todos = todos;
        Ok(())
    }
}

fn validated_text(text: &str) -> StoreResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::Validation("todo text cannot be empty".to_string()));
    }
    Ok(text.to_string())
}

fn validate_all(todos: &[Todo]) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for (index, todo) in todos.iter().enumerate() {
        if todo.text.trim().is_empty() {
            return Err(StoreError::Validation(format!("todo #{} has empty text", index + 1)));
        }
        if todo.id.0.is_empty() {
            return Err(StoreError::Validation(format!("todo #{} has an empty id", index + 1)));
        }
        if !seen.insert(&todo.id) {
            return Err(StoreError::Validation(format!("duplicate todo id '{}'", todo.id)));
        }
    }
    Ok(())
}

/// Parse a JSON array of todos, as written by `export` or kept in storage.
pub fn parse_todos(json: &str) -> StoreResult<Vec<Todo>> {
    let todos: Vec<Todo> = serde_json::from_str(json)
        .map_err(|e| StoreError::Validation(format!("not a list of todos: {}", e)))?;
    validate_all(&todos)?;
    Ok(todos)
}

/// The todo list together with the storage it is mirrored to. Every
/// mutation writes the full list before returning.
pub struct Store<S: KeyValueStore> {
    list: TodoList,
    storage: S,
}

impl<S: KeyValueStore> Store<S> {
    /// Read the list from storage. A missing or unreadable list is an empty
    /// one.
    pub fn load(storage: S) -> StoreResult<Self> {
        let list = match storage.get(TODOS_KEY)? {
            None => {
                tracing::debug!("no stored todos, starting empty");
                TodoList::default()
            }
            Some(json) => match parse_todos(&json) {
                Ok(todos) => {
                    tracing::debug!(count = todos.len(), "loaded todos");
                    TodoList::new(todos)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored todos are corrupt, starting empty");
                    TodoList::default()
                }
            },
        };
        Ok(Store { list, storage })
    }

    pub fn persist(&mut self) -> StoreResult<()> {
        let json = serde_json::to_string(self.list.todos()).map_err(StorageError::from)?;
        self.storage.set(TODOS_KEY, &json)?;
        tracing::debug!(count = self.list.todos().len(), "persisted todos");
        Ok(())
    }

    pub fn todos(&self) -> &[Todo] {
        self.list.todos()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn resolve(&self, reference: &str) -> StoreResult<TodoId> {
        self.list.resolve(reference)
    }

    pub fn add(&mut self, new: NewTodo) -> StoreResult<Todo> {
        let todo = self.list.add(new, Utc::now())?.clone();
        self.persist()?;
        tracing::info!(id = %todo.id, "added todo");
        Ok(todo)
    }

    pub fn update(&mut self, id: &TodoId, update: TodoUpdate) -> StoreResult<Todo> {
        let todo = self.list.update(id, update)?.clone();
        self.persist()?;
        tracing::info!(id = %todo.id, "updated todo");
        Ok(todo)
    }

    pub fn toggle_completed(&mut self, id: &TodoId) -> StoreResult<bool> {
        let completed = self.list.toggle_completed(id)?;
        self.persist()?;
        Ok(completed)
    }

    pub fn toggle_selected(&mut self, id: &TodoId) -> StoreResult<bool> {
        let selected = self.list.toggle_selected(id)?;
        self.persist()?;
        Ok(selected)
    }

    pub fn select_all(&mut self, ids: &[TodoId]) -> StoreResult<bool> {
        let selected = self.list.select_all(ids);
        self.persist()?;
        Ok(selected)
    }

    pub fn remove(&mut self, id: &TodoId) -> StoreResult<Todo> {
        let todo = self.list.remove(id)?;
        self.persist()?;
        tracing::info!(id = %todo.id, "removed todo");
        Ok(todo)
    }

    pub fn remove_where<P>(&mut self, predicate: P) -> StoreResult<usize>
    where
        P: FnMut(&Todo) -> bool,
    {
        let removed = self.list.remove_where(predicate);
        self.persist()?;
        tracing::info!(removed, "bulk removed todos");
        Ok(removed)
    }

    pub fn set_completed_where<P>(&mut self, predicate: P) -> StoreResult<usize>
    where
        P: FnMut(&Todo) -> bool,
    {
        let completed = self.list.set_completed_where(predicate);
        self.persist()?;
        tracing::info!(completed, "bulk completed todos");
        Ok(completed)
    }

    pub fn replace_all(&mut self, todos: Vec<Todo>) -> StoreResult<()> {
        self.list.replace_all(todos)?;
        self.persist()?;
        tracing::info!(count = self.list.todos().len(), "replaced all todos");
        Ok(())
    }
}
