use std::collections::HashSet;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::todo::Todo;

/// Ordered list of todos plus the id counter.
///
/// Ids come from a counter that only moves forward, so an id is never handed
/// out twice even after the record carrying it was deleted.
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todos: Vec<Todo>,
    counter: u64,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a persisted list. The counter resumes past the
    /// highest id seen.
    ///
    /// Fails on duplicate ids or on an id with no successor, since either
    /// would let a later `add` hand out an id already in use.
    #[tracing::instrument(skip(todos), fields(count = todos.len()))]
    pub fn from_todos(todos: Vec<Todo>) -> anyhow::Result<Self> {
        let mut seen = HashSet::with_capacity(todos.len());
        let mut counter = 0_u64;
        for todo in &todos {
            if !seen.insert(todo.id) {
                return Err(anyhow!("duplicate todo id {}", todo.id));
            }
            let next = todo
                .id
                .checked_add(1)
                .ok_or_else(|| anyhow!("todo id {} leaves no room for new ids", todo.id))?;
            counter = counter.max(next);
        }
        info!(count = todos.len(), next_id = counter, "hydrated todo store");
        Ok(Self { todos, counter })
    }

    /// Appends an active todo and returns its id. Returns `None` only once
    /// the id space is used up.
    #[tracing::instrument(skip(self, title, description))]
    pub fn add(&mut self, title: String, description: String) -> Option<u64> {
        let id = self.counter;
        let Some(next) = id.checked_add(1) else {
            warn!(id, "todo ids exhausted; add refused");
            return None;
        };
        self.todos.push(Todo::new_active(id, title, description));
        self.counter = next;
        debug!(id, count = self.todos.len(), "todo added");
        Some(id)
    }

    /// Flips the status of `id`. Returns `false` when no such todo exists.
    #[tracing::instrument(skip(self))]
    pub fn toggle_status(&mut self, id: u64) -> bool {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle ignored; no such todo");
            return false;
        };
        todo.status = todo.status.toggled();
        debug!(id, status = %todo.status, "todo toggled");
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: u64) -> Option<Todo> {
        let Some(idx) = self.todos.iter().position(|t| t.id == id) else {
            debug!(id, "delete ignored; no such todo");
            return None;
        };
        let removed = self.todos.remove(idx);
        debug!(id, count = self.todos.len(), "todo deleted");
        Some(removed)
    }

    pub fn get(&self, id: u64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.counter
    }
}
