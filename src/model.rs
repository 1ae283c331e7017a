use log::warn;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Decimal creation timestamp in milliseconds.
pub type TodoId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Work,
    Travel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(skip)]
    pub id: TodoId,
    pub text: String,
    #[serde(alias = "working", default)]
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
}

/// Todo items keyed by id, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoCollection {
    items: HashMap<TodoId, TodoItem>,
    order: Vec<TodoId>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    #[error("todo not found: {0}")]
    NotFound(TodoId),
    #[error("todo text is empty")]
    EmptyText,
    #[error("todo {0} is not being edited")]
    NotEditing(TodoId),
    #[error("duplicate todo id: {0}")]
    DuplicateId(TodoId),
    #[error("unknown category: {0} (expected work or travel)")]
    UnknownCategory(String),
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Work, Category::Travel];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Travel => "Travel",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Category::Work => "Add a to-do",
            Category::Travel => "Where do you want to go?",
        }
    }

    pub fn other(&self) -> Category {
        match self {
            Category::Work => Category::Travel,
            Category::Travel => Category::Work,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Category::Work),
            "travel" => Ok(Category::Travel),
            _ => Err(TodoError::UnknownCategory(s.to_string())),
        }
    }
}

// Older data stores the category as a `working` flag.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Working(bool),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Working(true) => Ok(Category::Work),
            Repr::Working(false) => Ok(Category::Travel),
            Repr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

impl TodoItem {
    pub fn new(id: TodoId, text: impl Into<String>, category: Category) -> Self {
        TodoItem {
            id,
            text: text.into(),
            category,
            completed: false,
        }
    }
}

impl TodoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.items.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TodoItem> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &TodoItem> + '_ {
        self.iter().filter(move |item| item.category == category)
    }

    pub fn insert(&mut self, item: TodoItem) -> Result<(), TodoError> {
        if item.text.trim().is_empty() {
            return Err(TodoError::EmptyText);
        }
        if self.items.contains_key(&item.id) {
            return Err(TodoError::DuplicateId(item.id));
        }
        self.order.push(item.id.clone());
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<TodoItem, TodoError> {
        let item = self
            .items
            .remove(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        self.order.retain(|existing| existing != id);
        Ok(item)
    }

    pub fn update<F>(&mut self, id: &str, f: F) -> Result<(), TodoError>
    where
        F: FnOnce(&mut TodoItem),
    {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        f(item);
        Ok(())
    }

    /// Picks an id from `now_millis`, bumped past every numeric id already
    /// present so ids stay unique and increasing. Once the largest id is
    /// `u64::MAX` the first unused value from `now_millis` on is taken.
    pub fn next_id(&self, now_millis: i64) -> TodoId {
        let now = u64::try_from(now_millis).unwrap_or(0);
        let max = self
            .items
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max();
        match max.map(|max| max.checked_add(1)) {
            None => now.to_string(),
            Some(Some(floor)) => now.max(floor).to_string(),
            Some(None) => (now..=u64::MAX)
                .chain(0..now)
                .map(|n| n.to_string())
                .find(|id| !self.items.contains_key(id))
                .unwrap_or_default(),
        }
    }
}

impl Serialize for TodoCollection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for item in self.iter() {
            map.serialize_entry(&item.id, item)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TodoCollection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = TodoCollection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of todo ids to todo items")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut collection = TodoCollection::new();
                while let Some((id, mut item)) = access.next_entry::<TodoId, TodoItem>()? {
                    item.id = id.clone();
                    // Entries that could never have been stored are dropped.
                    if let Err(err) = collection.insert(item) {
                        warn!("dropping stored todo {}: {}", id, err);
                    }
                }
                Ok(collection)
            }
        }

        deserializer.deserialize_map(CollectionVisitor)
    }
}
