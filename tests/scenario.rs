use errand::{Category, Confirmation, FileStore, KeyValueStore, TodoCollection, TodoStore};
use std::path::Path;

fn open(path: &Path) -> TodoStore {
    TodoStore::open(FileStore::open(path).unwrap()).unwrap()
}

fn add(store: &mut TodoStore, text: &str) -> String {
    store.set_draft_text(text).unwrap();
    store.add_todo().unwrap()
}

#[test]
fn work_and_travel_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yml");
    let mut store = open(&path);

    assert_eq!(store.active_category(), Category::Work);
    assert!(store.collection().is_empty());

    let milk = add(&mut store, "Buy milk");
    let item = store.get(&milk).unwrap();
    assert_eq!(item.category, Category::Work);
    assert!(!item.completed);

    store.set_active_category(Category::Travel).unwrap();
    let flight = add(&mut store, "Book flight");
    assert_eq!(store.collection().len(), 2);
    assert_eq!(store.get(&flight).unwrap().category, Category::Travel);

    store.toggle_complete(milk.clone()).unwrap();
    assert!(store.get(&milk).unwrap().completed);
    store.flush();
    let raw = FileStore::open(&path).unwrap().get("todos").unwrap().unwrap();
    let persisted: TodoCollection = serde_json::from_str(&raw).unwrap();
    assert!(persisted.get(&milk).unwrap().completed);

    store.start_edit(flight.clone(), "Book flight").unwrap();
    store.update_edit_draft("Book flight to Tokyo").unwrap();
    store.save_edit(flight.clone()).unwrap();
    assert_eq!(store.get(&flight).unwrap().text, "Book flight to Tokyo");

    store.delete_todo(milk.clone(), Confirmation::Confirm).unwrap();
    assert_eq!(store.collection().len(), 1);
    assert!(store.get(&flight).is_some());

    let expected = store.collection().clone();
    drop(store);

    let reopened = open(&path);
    assert_eq!(reopened.active_category(), Category::Travel);
    assert_eq!(*reopened.collection(), expected);
    assert_eq!(reopened.draft_text(), "");
    assert!(reopened.editing().is_none());
}

#[test]
fn reload_keeps_display_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yml");
    let mut store = open(&path);
    for text in ["c", "a", "b", "d"] {
        add(&mut store, text);
    }
    drop(store);

    let reopened = open(&path);
    let texts: Vec<_> = reopened.visible().map(|item| item.text.as_str()).collect();
    assert_eq!(texts, vec!["c", "a", "b", "d"]);
}

#[test]
fn ids_stay_unique_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yml");
    let mut store = open(&path);
    let first = add(&mut store, "first");
    drop(store);

    let mut store = open(&path);
    let second = add(&mut store, "second");
    assert_ne!(first, second);
    assert!(second.parse::<u64>().unwrap() > first.parse::<u64>().unwrap());
}

#[test]
fn original_format_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yml");
    let mut backend = FileStore::open(&path).unwrap();
    backend
        .set(
            "todos",
            r#"{"1700000000000":{"text":"Pack bags","working":false}}"#,
        )
        .unwrap();
    backend.set("workingState", "false").unwrap();

    let store = open(&path);
    assert_eq!(store.active_category(), Category::Travel);
    let texts: Vec<_> = store.visible().map(|item| item.text.as_str()).collect();
    assert_eq!(texts, vec!["Pack bags"]);
}
