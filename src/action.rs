//! Every change to the todo store is an `Action`.
//!
//! The UI and the command line build actions from user input and hand them
//! to `TodoStore::dispatch`, which applies them and then issues whatever
//! persistence write the change needs.

use crate::model::{Category, TodoId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetActiveCategory(Category),
    SetDraftText(String),
    AddTodo,
    DeleteTodo {
        id: TodoId,
        confirmation: Confirmation,
    },
    ToggleComplete(TodoId),
    StartEdit {
        id: TodoId,
        current_text: String,
    },
    UpdateEditDraft(String),
    SaveEdit(TodoId),
    CancelEdit,
}

/// Answer from the delete prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirm,
    Cancel,
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Unchanged,
    /// Only transient input state moved; nothing was written.
    Transient,
    CategorySet(Category),
    Added(TodoId),
    Updated(TodoId),
    Removed(TodoId),
}

impl Change {
    pub fn is_persisted(&self) -> bool {
        matches!(
            self,
            Change::CategorySet(_) | Change::Added(_) | Change::Updated(_) | Change::Removed(_)
        )
    }
}
