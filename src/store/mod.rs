//! Data sources backing selection fields.
//!
//! Stores are shared between a selection field and whatever renders its
//! list, so every method takes `&self` and implementations keep their state
//! behind interior mutability. Everything runs on one thread.

mod memory;
mod tree;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::{MemoryStore, RecordLoader};
pub use tree::{TreeNode, TreeStore};

pub type Record = Map<String, Value>;

/// Position of a record in the visible list: a flat index, or a path of
/// child indices from the root for hierarchical stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordIndex {
    Flat(usize),
    Path(Vec<usize>),
}

impl RecordIndex {
    /// Index at the deepest level, which is what a list highlights.
    pub fn deepest(&self) -> Option<usize> {
        match self {
            RecordIndex::Flat(index) => Some(*index),
            RecordIndex::Path(path) => path.last().copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    /// Case-insensitive substring match.
    #[default]
    Like,
    StartsWith,
}

impl FilterOperator {
    pub fn matches(&self, candidate: &Value, keyword: &str) -> bool {
        let text = match candidate {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        match self {
            FilterOperator::Eq => text == keyword,
            FilterOperator::Like => text.to_lowercase().contains(&keyword.to_lowercase()),
            FilterOperator::StartsWith => text.starts_with(keyword),
        }
    }
}

/// An active store filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub keyword: String,
    pub operator: FilterOperator,
}

impl Filter {
    pub fn accepts(&self, record: &Record) -> bool {
        record
            .get(&self.field)
            .is_some_and(|value| self.operator.matches(value, &self.keyword))
    }
}

pub trait Store {
    fn load(&self) -> LocalBoxFuture<'_, Result<()>>;
    fn reload(&self) -> LocalBoxFuture<'_, Result<()>>;
    fn is_loaded(&self) -> bool;
    fn find(&self, partial: &Record) -> Option<Record>;
    fn find_index(&self, partial: &Record) -> Option<RecordIndex>;
    fn set_filter(&self, field: &str, keyword: &str, operator: FilterOperator);
    fn reset_filter(&self);

    /// Ancestor lookup, for stores whose records form a tree.
    fn hierarchy(&self) -> Option<&dyn Hierarchical> {
        None
    }
}

impl std::fmt::Debug for dyn Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("loaded", &self.is_loaded())
            .field("hierarchical", &self.hierarchy().is_some())
            .finish()
    }
}

pub trait Hierarchical {
    /// Ancestor chain (root first) of the record matching `target`, or
    /// `None` when no such record exists. Expands the chain so the target
    /// becomes findable.
    fn get_parents(&self, target: &Record) -> LocalBoxFuture<'_, Result<Option<Vec<Record>>>>;
}

/// Whether `record` carries every entry of `partial`.
pub fn matches_partial(record: &Record, partial: &Record) -> bool {
    partial
        .iter()
        .all(|(key, value)| record.get(key) == Some(value))
}

/// The single-entry lookup used by selection fields.
pub fn lookup(field: &str, value: &Value) -> Record {
    let mut partial = Record::new();
    partial.insert(field.to_string(), value.clone());
    partial
}
