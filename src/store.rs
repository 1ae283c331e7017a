use crate::action::{Action, Change, Confirmation};
use crate::model::{Category, TodoCollection, TodoError, TodoId, TodoItem};
use crate::persist::WriteQueue;
use crate::storage::{KeyValueStore, StorageError};
use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const TODOS_KEY: &str = "todos";
pub const CATEGORY_KEY: &str = "workingState";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: TodoId,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub active_category: Category,
    pub collection: TodoCollection,
    pub draft_text: String,
    pub editing: Option<EditDraft>,
}

/// Owns the session's `AppState` and writes the persisted half of it back
/// after every mutation.
pub struct TodoStore {
    state: AppState,
    writer: WriteQueue,
}

impl TodoStore {
    /// Loads persisted state from `backend`, falling back to defaults for
    /// anything missing or unreadable, then hands the backend to the writer.
    pub fn open<S>(backend: S) -> Result<Self, StorageError>
    where
        S: KeyValueStore + Send + 'static,
    {
        let active_category: Category = load_value(&backend, CATEGORY_KEY).unwrap_or_default();
        let collection: TodoCollection = load_value(&backend, TODOS_KEY).unwrap_or_default();
        info!(
            "loaded {} todos, active category {}",
            collection.len(),
            active_category
        );
        let writer = WriteQueue::spawn(backend)?;
        Ok(TodoStore {
            state: AppState {
                active_category,
                collection,
                ..AppState::default()
            },
            writer,
        })
    }

    /// Applies `action`. On error nothing changed and nothing was written.
    pub fn dispatch(&mut self, action: Action) -> Result<Change, TodoError> {
        debug!("dispatch {:?}", action);
        let change = self.apply(action)?;
        match &change {
            Change::CategorySet(_) => self.persist(CATEGORY_KEY, &self.state.active_category),
            Change::Added(_) | Change::Updated(_) | Change::Removed(_) => {
                self.persist(TODOS_KEY, &self.state.collection)
            }
            Change::Unchanged | Change::Transient => {}
        }
        Ok(change)
    }

    fn apply(&mut self, action: Action) -> Result<Change, TodoError> {
        let state = &mut self.state;
        match action {
            Action::SetActiveCategory(category) => {
                state.active_category = category;
                Ok(Change::CategorySet(category))
            }
            Action::SetDraftText(text) => {
                state.draft_text = text;
                Ok(Change::Transient)
            }
            Action::AddTodo => {
                let text = state.draft_text.trim();
                if text.is_empty() {
                    return Err(TodoError::EmptyText);
                }
                let id = state.collection.next_id(Utc::now().timestamp_millis());
                let item = TodoItem::new(id.clone(), text, state.active_category);
                state.collection.insert(item)?;
                state.draft_text.clear();
                Ok(Change::Added(id))
            }
            Action::DeleteTodo { id, confirmation } => {
                if confirmation == Confirmation::Cancel {
                    return Ok(Change::Unchanged);
                }
                state.collection.remove(&id)?;
                if state.editing.as_ref().is_some_and(|draft| draft.id == id) {
                    state.editing = None;
                }
                Ok(Change::Removed(id))
            }
            Action::ToggleComplete(id) => {
                state
                    .collection
                    .update(&id, |item| item.completed = !item.completed)?;
                Ok(Change::Updated(id))
            }
            Action::StartEdit { id, current_text } => {
                if !state.collection.contains(&id) {
                    return Err(TodoError::NotFound(id));
                }
                state.editing = Some(EditDraft {
                    id,
                    text: current_text,
                });
                Ok(Change::Transient)
            }
            Action::UpdateEditDraft(text) => match state.editing.as_mut() {
                Some(draft) => {
                    draft.text = text;
                    Ok(Change::Transient)
                }
                None => Ok(Change::Unchanged),
            },
            Action::SaveEdit(id) => {
                let text = match &state.editing {
                    Some(draft) if draft.id == id => draft.text.trim().to_string(),
                    _ => return Err(TodoError::NotEditing(id)),
                };
                if text.is_empty() {
                    return Err(TodoError::EmptyText);
                }
                state.collection.update(&id, |item| item.text = text)?;
                state.editing = None;
                Ok(Change::Updated(id))
            }
            Action::CancelEdit => match state.editing.take() {
                Some(_) => Ok(Change::Transient),
                None => Ok(Change::Unchanged),
            },
        }
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(encoded) => self.writer.write(key, encoded),
            Err(err) => warn!("could not encode {}: {}", key, err),
        }
    }

    pub fn set_active_category(&mut self, category: Category) -> Result<Change, TodoError> {
        self.dispatch(Action::SetActiveCategory(category))
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) -> Result<Change, TodoError> {
        self.dispatch(Action::SetDraftText(text.into()))
    }

    /// Adds the current draft under the active category.
    pub fn add_todo(&mut self) -> Result<TodoId, TodoError> {
        match self.dispatch(Action::AddTodo)? {
            Change::Added(id) => Ok(id),
            _ => Err(TodoError::EmptyText),
        }
    }

    pub fn delete_todo(
        &mut self,
        id: impl Into<TodoId>,
        confirmation: Confirmation,
    ) -> Result<Change, TodoError> {
        self.dispatch(Action::DeleteTodo {
            id: id.into(),
            confirmation,
        })
    }

    pub fn toggle_complete(&mut self, id: impl Into<TodoId>) -> Result<Change, TodoError> {
        self.dispatch(Action::ToggleComplete(id.into()))
    }

    pub fn start_edit(
        &mut self,
        id: impl Into<TodoId>,
        current_text: impl Into<String>,
    ) -> Result<Change, TodoError> {
        self.dispatch(Action::StartEdit {
            id: id.into(),
            current_text: current_text.into(),
        })
    }

    pub fn update_edit_draft(&mut self, text: impl Into<String>) -> Result<Change, TodoError> {
        self.dispatch(Action::UpdateEditDraft(text.into()))
    }

    pub fn save_edit(&mut self, id: impl Into<TodoId>) -> Result<Change, TodoError> {
        self.dispatch(Action::SaveEdit(id.into()))
    }

    pub fn cancel_edit(&mut self) -> Result<Change, TodoError> {
        self.dispatch(Action::CancelEdit)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn active_category(&self) -> Category {
        self.state.active_category
    }

    pub fn draft_text(&self) -> &str {
        &self.state.draft_text
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.state.editing.as_ref()
    }

    pub fn collection(&self) -> &TodoCollection {
        &self.state.collection
    }

    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.state.collection.get(id)
    }

    /// Items in the active category, in insertion order.
    pub fn visible(&self) -> impl Iterator<Item = &TodoItem> + '_ {
        self.state.collection.in_category(self.state.active_category)
    }

    /// `(total, completed)` for `category`.
    pub fn counts(&self, category: Category) -> (usize, usize) {
        self.state
            .collection
            .in_category(category)
            .fold((0, 0), |(total, done), item| {
                (total + 1, done + usize::from(item.completed))
            })
    }

    /// Waits for every write issued so far to reach the backend.
    pub fn flush(&self) {
        self.writer.flush();
    }
}

fn load_value<S, T>(backend: &S, key: &str) -> Option<T>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    match backend.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("discarding malformed {}: {}", key, err);
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!("could not read {}: {}", key, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn open() -> (TodoStore, MemoryStore) {
        let backend = MemoryStore::new();
        let store = TodoStore::open(backend.clone()).unwrap();
        (store, backend)
    }

    fn add(store: &mut TodoStore, text: &str) -> TodoId {
        store.set_draft_text(text).unwrap();
        store.add_todo().unwrap()
    }

    fn persisted_todos(store: &TodoStore, backend: &MemoryStore) -> TodoCollection {
        store.flush();
        let raw = backend.get(TODOS_KEY).unwrap().expect("todos written");
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn starts_with_defaults_when_nothing_is_stored() {
        let (store, _) = open();
        assert_eq!(store.active_category(), Category::Work);
        assert!(store.collection().is_empty());
        assert_eq!(store.draft_text(), "");
        assert!(store.editing().is_none());
    }

    #[test]
    fn malformed_stored_values_fall_back_to_defaults() {
        let backend = MemoryStore::new()
            .with_entry(TODOS_KEY, "{not json")
            .with_entry(CATEGORY_KEY, "\"beach\"");
        let store = TodoStore::open(backend).unwrap();
        assert_eq!(store.active_category(), Category::Work);
        assert!(store.collection().is_empty());
    }

    #[test]
    fn loads_original_working_flag() {
        let backend = MemoryStore::new().with_entry(CATEGORY_KEY, "false");
        let store = TodoStore::open(backend).unwrap();
        assert_eq!(store.active_category(), Category::Travel);
    }

    #[test]
    fn each_add_inserts_one_unique_item() {
        let (mut store, backend) = open();
        let ids: Vec<_> = (0..25).map(|n| add(&mut store, &format!("item {n}"))).collect();
        assert_eq!(store.collection().len(), 25);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 25);
        assert_eq!(store.draft_text(), "");
        assert_eq!(persisted_todos(&store, &backend), *store.collection());
    }

    #[test]
    fn add_with_empty_draft_is_a_no_op() {
        let (mut store, backend) = open();
        store.set_draft_text("   ").unwrap();
        assert_eq!(store.add_todo(), Err(TodoError::EmptyText));
        assert!(store.collection().is_empty());
        assert_eq!(store.draft_text(), "   ");
        store.flush();
        assert_eq!(backend.get(TODOS_KEY).unwrap(), None);
    }

    #[test]
    fn add_uses_active_category_and_trims() {
        let (mut store, _) = open();
        store.set_active_category(Category::Travel).unwrap();
        let id = add(&mut store, "  Book flight ");
        let item = store.get(&id).unwrap();
        assert_eq!(item.text, "Book flight");
        assert_eq!(item.category, Category::Travel);
        assert!(!item.completed);
    }

    #[test]
    fn toggle_twice_restores_completion() {
        let (mut store, backend) = open();
        let id = add(&mut store, "Buy milk");
        store.toggle_complete(id.clone()).unwrap();
        assert!(store.get(&id).unwrap().completed);
        assert!(persisted_todos(&store, &backend).get(&id).unwrap().completed);
        store.toggle_complete(id.clone()).unwrap();
        assert!(!store.get(&id).unwrap().completed);
        assert!(!persisted_todos(&store, &backend).get(&id).unwrap().completed);
    }

    #[test]
    fn toggle_missing_id_changes_nothing() {
        let (mut store, _) = open();
        add(&mut store, "Buy milk");
        let before = store.state().clone();
        assert_eq!(
            store.toggle_complete("nope"),
            Err(TodoError::NotFound("nope".into()))
        );
        assert_eq!(*store.state(), before);
    }

    #[test]
    fn delete_respects_confirmation() {
        let (mut store, backend) = open();
        let keep = add(&mut store, "keep");
        let doomed = add(&mut store, "drop");

        assert_eq!(
            store.delete_todo(doomed.clone(), Confirmation::Cancel),
            Ok(Change::Unchanged)
        );
        assert_eq!(store.collection().len(), 2);

        assert_eq!(
            store.delete_todo(doomed.clone(), Confirmation::Confirm),
            Ok(Change::Removed(doomed.clone()))
        );
        assert_eq!(store.collection().len(), 1);
        assert!(store.get(&keep).is_some());
        assert!(store.get(&doomed).is_none());
        assert!(persisted_todos(&store, &backend).get(&doomed).is_none());

        assert!(store.delete_todo(doomed, Confirmation::Confirm).is_err());
        assert_eq!(store.collection().len(), 1);
    }

    #[test]
    fn delete_discards_edit_of_that_item() {
        let (mut store, _) = open();
        let id = add(&mut store, "old");
        store.start_edit(id.clone(), "old").unwrap();
        store.delete_todo(id, Confirmation::Confirm).unwrap();
        assert!(store.editing().is_none());
    }

    #[test]
    fn save_edit_changes_only_text() {
        let (mut store, backend) = open();
        let id = add(&mut store, "old");
        store.toggle_complete(id.clone()).unwrap();
        let before = store.get(&id).unwrap().clone();

        store.start_edit(id.clone(), "old").unwrap();
        store.update_edit_draft("new").unwrap();
        assert_eq!(store.get(&id).unwrap().text, "old");
        store.save_edit(id.clone()).unwrap();

        let after = store.get(&id).unwrap();
        assert_eq!(after.text, "new");
        assert_eq!(after.id, before.id);
        assert_eq!(after.category, before.category);
        assert_eq!(after.completed, before.completed);
        assert!(store.editing().is_none());
        assert_eq!(persisted_todos(&store, &backend).get(&id).unwrap().text, "new");
    }

    #[test]
    fn save_edit_requires_matching_edit() {
        let (mut store, _) = open();
        let first = add(&mut store, "first");
        let second = add(&mut store, "second");

        assert_eq!(
            store.save_edit(first.clone()),
            Err(TodoError::NotEditing(first.clone()))
        );

        store.start_edit(first.clone(), "first").unwrap();
        store.update_edit_draft("changed").unwrap();
        assert_eq!(
            store.save_edit(second.clone()),
            Err(TodoError::NotEditing(second.clone()))
        );
        assert_eq!(store.get(&second).unwrap().text, "second");
        assert_eq!(store.get(&first).unwrap().text, "first");
    }

    #[test]
    fn empty_edit_draft_keeps_edit_open() {
        let (mut store, _) = open();
        let id = add(&mut store, "text");
        store.start_edit(id.clone(), "text").unwrap();
        store.update_edit_draft("").unwrap();
        assert_eq!(store.save_edit(id.clone()), Err(TodoError::EmptyText));
        assert_eq!(store.get(&id).unwrap().text, "text");
        assert!(store.editing().is_some());
        store.cancel_edit().unwrap();
        assert!(store.editing().is_none());
    }

    #[test]
    fn save_edit_of_vanished_item_leaves_state_alone() {
        let (mut store, _) = open();
        let id = add(&mut store, "text");
        store.start_edit(id.clone(), "text").unwrap();
        store.update_edit_draft("changed").unwrap();
        store.state.collection.remove(&id).unwrap();
        let before = store.state().clone();

        assert_eq!(store.save_edit(id.clone()), Err(TodoError::NotFound(id)));
        assert_eq!(*store.state(), before);
        assert!(store.editing().is_some());
    }

    #[test]
    fn update_edit_draft_without_edit_is_ignored() {
        let (mut store, _) = open();
        assert_eq!(store.update_edit_draft("x"), Ok(Change::Unchanged));
        assert!(store.editing().is_none());
    }

    #[test]
    fn visible_matches_active_category() {
        let (mut store, _) = open();
        add(&mut store, "w1");
        store.set_active_category(Category::Travel).unwrap();
        add(&mut store, "t1");
        store.set_active_category(Category::Work).unwrap();
        add(&mut store, "w2");
        store.set_active_category(Category::Travel).unwrap();
        add(&mut store, "t2");

        let travel: Vec<_> = store.visible().map(|t| t.text.as_str()).collect();
        assert_eq!(travel, vec!["t1", "t2"]);
        assert!(store.visible().all(|t| t.category == Category::Travel));

        store.set_active_category(Category::Work).unwrap();
        let work: Vec<_> = store.visible().map(|t| t.text.as_str()).collect();
        assert_eq!(work, vec!["w1", "w2"]);
    }

    #[test]
    fn category_change_persists_only_category() {
        let (mut store, backend) = open();
        store.set_active_category(Category::Travel).unwrap();
        store.flush();
        assert_eq!(backend.get(CATEGORY_KEY).unwrap().as_deref(), Some("\"travel\""));
        assert_eq!(backend.get(TODOS_KEY).unwrap(), None);
    }

    #[test]
    fn counts_report_totals_and_completed() {
        let (mut store, _) = open();
        let a = add(&mut store, "a");
        add(&mut store, "b");
        store.toggle_complete(a).unwrap();
        assert_eq!(store.counts(Category::Work), (2, 1));
        assert_eq!(store.counts(Category::Travel), (0, 0));
    }
}
