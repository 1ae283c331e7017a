pub mod action;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod model;
pub mod persist;
pub mod storage;
pub mod store;
mod ui;

pub use action::{Action, Change, Confirmation};
pub use model::{Category, TodoCollection, TodoError, TodoId, TodoItem};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{AppState, EditDraft, TodoStore};
