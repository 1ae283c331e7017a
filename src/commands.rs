use crate::action::Confirmation;
use crate::config::Settings;
use crate::model::{Category, TodoError, TodoItem};
use crate::storage::FileStore;
use crate::store::TodoStore;
use crate::ui;
use anyhow::{Context, Result};
use log::info;
use std::io::{self, BufRead, Write};

pub fn list(settings: &Settings, category: Option<Category>, all: bool) -> Result<()> {
    let store = open_store(settings)?;
    let categories = if all {
        Category::ALL.to_vec()
    } else {
        vec![category.unwrap_or(store.active_category())]
    };
    for category in categories {
        let (total, done) = store.counts(category);
        let marker = if category == store.active_category() {
            " *"
        } else {
            ""
        };
        println!("{}{} ({}/{} done)", category, marker, done, total);
        if total == 0 {
            println!("  (empty)");
        }
        for item in store.collection().in_category(category) {
            print_item(item);
        }
        println!();
    }
    Ok(())
}

pub fn add(settings: &Settings, text: String, category: Option<Category>) -> Result<()> {
    let mut store = open_store(settings)?;
    if let Some(category) = category {
        if category != store.active_category() {
            store.set_active_category(category)?;
        }
    }
    store.set_draft_text(text)?;
    match store.add_todo() {
        Ok(id) => {
            info!("added {} via cli", id);
            println!("Added {} to {}", id, store.active_category());
        }
        Err(TodoError::EmptyText) => println!("Nothing to add: text is empty"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

pub fn toggle(settings: &Settings, id: String) -> Result<()> {
    let mut store = open_store(settings)?;
    if let Err(err) = store.toggle_complete(id.as_str()) {
        return report(err);
    }
    if let Some(item) = store.get(&id) {
        let state = if item.completed { "completed" } else { "open" };
        println!("Marked {} {}", id, state);
    }
    Ok(())
}

pub fn edit(settings: &Settings, id: String, text: String) -> Result<()> {
    let mut store = open_store(settings)?;
    let current = match store.get(&id) {
        Some(item) => item.text.clone(),
        None => return report(TodoError::NotFound(id)),
    };
    store.start_edit(id.as_str(), current)?;
    store.update_edit_draft(text)?;
    if let Err(err) = store.save_edit(id.as_str()) {
        return report(err);
    }
    println!("Updated {}", id);
    Ok(())
}

pub fn delete(settings: &Settings, id: String, yes: bool) -> Result<()> {
    let mut store = open_store(settings)?;
    let text = match store.get(&id) {
        Some(item) => item.text.clone(),
        None => return report(TodoError::NotFound(id)),
    };
    let confirmation = if yes {
        Confirmation::Confirm
    } else {
        prompt_confirmation(&text)?
    };
    store.delete_todo(id.as_str(), confirmation)?;
    match confirmation {
        Confirmation::Confirm => println!("Deleted {}", id),
        Confirmation::Cancel => println!("Delete canceled"),
    }
    Ok(())
}

pub fn switch(settings: &Settings, category: Category) -> Result<()> {
    let mut store = open_store(settings)?;
    store.set_active_category(category)?;
    println!("Active category: {}", category);
    Ok(())
}

pub fn tui(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    ui::run(store, settings.store_path.clone())
}

fn open_store(settings: &Settings) -> Result<TodoStore> {
    let backend = FileStore::open(&settings.store_path)
        .with_context(|| format!("opening store {:?}", settings.store_path))?;
    let store = TodoStore::open(backend).context("starting todo store")?;
    Ok(store)
}

// Stale ids are reported, not treated as failures.
fn report(err: TodoError) -> Result<()> {
    eprintln!("{}", err);
    Ok(())
}

fn prompt_confirmation(text: &str) -> Result<Confirmation> {
    print!("Delete \"{}\"? [y/N] ", text);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_confirmation(&answer))
}

fn parse_confirmation(answer: &str) -> Confirmation {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Confirmation::Confirm,
        _ => Confirmation::Cancel,
    }
}

fn print_item(item: &TodoItem) {
    let check = if item.completed { "x" } else { " " };
    println!("  [{}] {}: {}", check, item.id, item.text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert_eq!(parse_confirmation("y\n"), Confirmation::Confirm);
        assert_eq!(parse_confirmation(" YES "), Confirmation::Confirm);
        assert_eq!(parse_confirmation("\n"), Confirmation::Cancel);
        assert_eq!(parse_confirmation("nope"), Confirmation::Cancel);
    }
}
