use std::time::Duration;

use tracing::{debug, error, info};

use crate::datastore::PersistenceAdapter;
use crate::filter::{Filter, FilterSelector};
use crate::saver::SaveQueue;
use crate::store::TodoStore;
use crate::todo::Todo;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub initial_filter: Filter,
    pub save_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_filter: Filter::All,
            save_debounce: Duration::from_millis(25),
        }
    }
}

/// Owns everything a todo screen works with: the store, the view filter, the
/// delete confirmation in progress, and the writer that mirrors the store to
/// disk. Every user intent goes through here.
#[derive(Debug)]
pub struct Session {
    store: TodoStore,
    selector: FilterSelector,
    pending_delete: Option<u64>,
    saver: Option<SaveQueue>,
}

impl Session {
    /// Session without persistence.
    pub fn in_memory(options: SessionOptions) -> Self {
        Self {
            store: TodoStore::new(),
            selector: FilterSelector::new(options.initial_filter),
            pending_delete: None,
            saver: None,
        }
    }

    /// Loads the saved list (if any) and starts the save queue. Loading
    /// finishes before this returns.
    #[tracing::instrument(skip(adapter, options))]
    pub fn open(adapter: PersistenceAdapter, options: SessionOptions) -> anyhow::Result<Self> {
        let store = match adapter.load().map(TodoStore::from_todos) {
            Some(Ok(store)) => store,
            Some(Err(err)) => {
                error!(error = %format!("{err:#}"), "saved todos are unusable; starting empty");
                TodoStore::new()
            }
            None => TodoStore::new(),
        };
        let saver = SaveQueue::spawn(adapter, options.save_debounce)?;

        info!(count = store.len(), filter = %options.initial_filter, "session opened");
        Ok(Self {
            store,
            selector: FilterSelector::new(options.initial_filter),
            pending_delete: None,
            saver: Some(saver),
        })
    }

    pub fn add_todo(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Option<u64> {
        let id = self.store.add(title.into(), description.into())?;
        self.persist();
        Some(id)
    }

    pub fn toggle_status(&mut self, id: u64) -> bool {
        let changed = self.store.toggle_status(id);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn delete(&mut self, id: u64) -> Option<Todo> {
        let removed = self.store.delete(id)?;
        if self.pending_delete == Some(id) {
            self.pending_delete = None;
        }
        self.persist();
        Some(removed)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.selector.set_filter(filter);
    }

    pub fn filter(&self) -> Filter {
        self.selector.current()
    }

    pub fn visible(&self) -> Vec<&Todo> {
        self.selector.apply(self.store.all())
    }

    pub fn todos(&self) -> &[Todo] {
        self.store.all()
    }

    pub fn details(&self, id: u64) -> Option<&Todo> {
        self.store.get(id)
    }

    /// Starts a delete confirmation for `id`. An unknown id leaves nothing
    /// pending.
    pub fn request_delete(&mut self, id: u64) -> Option<&Todo> {
        self.pending_delete = self.store.get(id).map(|t| t.id);
        debug!(id, pending = self.pending_delete.is_some(), "delete requested");
        self.pending_delete.and_then(|id| self.store.get(id))
    }

    pub fn pending_delete(&self) -> Option<&Todo> {
        self.pending_delete.and_then(|id| self.store.get(id))
    }

    pub fn confirm_delete(&mut self) -> Option<Todo> {
        let id = self.pending_delete.take()?;
        debug!(id, "delete confirmed");
        self.delete(id)
    }

    pub fn cancel_delete(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            debug!(id, "delete cancelled");
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.saver.is_some()
    }

    pub fn flush(&self) {
        if let Some(saver) = &self.saver {
            saver.flush();
        }
    }

    fn persist(&self) {
        if let Some(saver) = &self.saver {
            saver.schedule(self.store.all().to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::datastore::{KeyValueStore, MemoryStore, PersistenceAdapter, TODOS_KEY};
    use crate::todo::Status;

    fn session() -> Session {
        Session::in_memory(SessionOptions::default())
    }

    #[test]
    fn toggled_todo_moves_between_filters() {
        let mut s = session();
        let id = s.add_todo("Buy milk", "2%").expect("id");
        s.toggle_status(id);

        s.set_filter(Filter::Done);
        let visible: Vec<u64> = s.visible().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![id]);

        s.set_filter(Filter::Active);
        assert!(s.visible().is_empty());
    }

    #[test]
    fn delete_first_leaves_second() {
        let mut s = session();
        let first = s.add_todo("a", "").expect("id");
        let second = s.add_todo("b", "").expect("id");
        s.delete(first);

        s.set_filter(Filter::All);
        let visible: Vec<u64> = s.visible().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![second]);
    }

    #[test]
    fn confirmation_flow() {
        let mut s = session();
        let id = s.add_todo("a", "").expect("id");

        assert!(s.request_delete(99).is_none());
        assert!(s.confirm_delete().is_none());
        assert_eq!(s.todos().len(), 1);

        assert_eq!(s.request_delete(id).map(|t| t.id), Some(id));
        s.cancel_delete();
        assert!(s.pending_delete().is_none());
        assert_eq!(s.todos().len(), 1);

        s.request_delete(id);
        let removed = s.confirm_delete().expect("removed");
        assert_eq!(removed.id, id);
        assert!(s.todos().is_empty());
        assert!(s.pending_delete().is_none());
    }

    #[test]
    fn details_reflect_current_status() {
        let mut s = session();
        let id = s.add_todo("a", "desc").expect("id");
        s.toggle_status(id);
        let todo = s.details(id).expect("details");
        assert_eq!(todo.description, "desc");
        assert_eq!(todo.status, Status::Done);
        assert!(s.details(id + 1).is_none());
        assert!(!s.is_persistent());
    }

    #[test]
    fn saved_id_without_successor_opens_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set(
                TODOS_KEY,
                r#"[{"id":18446744073709551615,"title":"x","description":"","status":"active"}]"#,
            )
            .expect("seed");

        let mut s = Session::open(PersistenceAdapter::new(backend), SessionOptions::default())
            .expect("open");
        assert!(s.todos().is_empty());
        assert_eq!(s.add_todo("fresh", ""), Some(0));
    }

    #[test]
    fn saved_duplicate_ids_open_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set(
                TODOS_KEY,
                r#"[{"id":1,"title":"a","status":"active"},{"id":1,"title":"b","status":"done"}]"#,
            )
            .expect("seed");

        let s = Session::open(PersistenceAdapter::new(backend), SessionOptions::default())
            .expect("open");
        assert!(s.todos().is_empty());
    }
}
