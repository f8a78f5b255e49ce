//! Store-backed selection fields.
//!
//! A selection keeps the most recently requested raw value visible right
//! away and commits the resolved value once every id has been looked up in
//! its store. Each request is stamped with a generation; a resolution that
//! finishes after a newer request started is dropped.

mod resolve;
mod search;

use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::store::{FilterOperator, Record, RecordIndex, Store};

use super::error::DefinitionError;
use super::events::FormEvent;
use super::field::{FieldConfig, FieldRole};
use super::handle::FormHandle;
use super::tree::NodeId;

pub use search::SearchState;

#[derive(Debug)]
pub struct SelectionState {
    pub(crate) store: Rc<dyn Store>,
    pub(crate) value_field: String,
    pub(crate) display_field: String,
    pub(crate) search_field: String,
    pub(crate) search_operator: FilterOperator,
    pub(crate) multiple: bool,
    pub(crate) searchable: bool,
    pub(crate) raw_value: Value,
    pub(crate) generation: u64,
    pub(crate) records: Vec<Record>,
    pub(crate) highlighted: Vec<RecordIndex>,
    pub(crate) search: SearchState,
    pub(crate) search_box: Option<NodeId>,
}

impl SelectionState {
    pub fn new(store: Rc<dyn Store>) -> Self {
        Self {
            store,
            value_field: "id".to_string(),
            display_field: "name".to_string(),
            search_field: "name".to_string(),
            search_operator: FilterOperator::default(),
            multiple: false,
            searchable: false,
            raw_value: Value::Null,
            generation: 0,
            records: Vec::new(),
            highlighted: Vec::new(),
            search: SearchState::default(),
            search_box: None,
        }
    }

    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value_field = field.into();
        self
    }

    pub fn with_display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = field.into();
        self
    }

    pub fn with_search(mut self, field: impl Into<String>, operator: FilterOperator) -> Self {
        self.search_field = field.into();
        self.search_operator = operator;
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Adds a type-ahead search box as a sub-field.
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    pub fn raw_value(&self) -> &Value {
        &self.raw_value
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn highlighted(&self) -> &[RecordIndex] {
        &self.highlighted
    }

    pub fn search_box(&self) -> Option<NodeId> {
        self.search_box
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Display text of the resolved records.
    pub fn display_text(&self) -> String {
        self.records
            .iter()
            .map(|record| match record.get(&self.display_field) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FormHandle {
    /// Registers a selection field, plus its search box when searchable.
    pub fn add_selection(
        &self,
        parent: Option<NodeId>,
        config: FieldConfig,
    ) -> Result<NodeId, DefinitionError> {
        let name = config.name.clone();
        let searchable = match &config.role {
            FieldRole::Selection(state) => state.searchable,
            _ => {
                return Err(DefinitionError::InvalidField {
                    field: name,
                    message: "not a selection field".to_string(),
                });
            }
        };
        self.update(|tree| {
            let id = tree.add_field(parent, config)?;
            if searchable {
                let search = FieldConfig::new(format!("{name}-search")).with_input_name(None);
                let search_id = tree.add_sub_field(id, search)?;
                if let Some(state) = tree.field_mut(id).and_then(|field| field.selection_mut()) {
                    state.search_box = Some(search_id);
                }
            }
            Ok(id)
        })
    }

    /// Stores `raw` immediately, then resolves it against the store and
    /// commits the result. Returns whether a change was committed.
    pub async fn set_selection_value(&self, id: NodeId, raw: Value, is_origin: bool) -> bool {
        let Some((store, value_field, multiple, generation)) = self.update(|tree| {
            let state = tree.field_mut(id)?.selection_mut()?;
            state.raw_value = raw.clone();
            state.generation += 1;
            Some((
                Rc::clone(&state.store),
                state.value_field.clone(),
                state.multiple,
                state.generation,
            ))
        }) else {
            return false;
        };

        let ids = resolve::normalize(&raw, multiple);
        let records = if ids.is_empty() {
            Vec::new()
        } else {
            resolve::resolve_records(store.as_ref(), &value_field, &ids).await
        };
        let mut resolved_ids = Vec::new();
        let mut resolved_records = Vec::new();
        for (raw_id, record) in ids.into_iter().zip(records) {
            if let Some(record) = record {
                resolved_ids.push(record.get(&value_field).cloned().unwrap_or(raw_id));
                resolved_records.push(record);
            }
        }
        let value = resolve::aggregate(resolved_ids, multiple);

        self.update(|tree| {
            let Some(state) = tree.field_mut(id).and_then(|field| field.selection_mut()) else {
                return false;
            };
            if state.generation != generation {
                debug!(field = %id, generation, latest = state.generation, "dropping stale resolution");
                return false;
            }
            state.records = resolved_records;
            tree.set_value(id, value, is_origin)
        })
    }

    /// Locates the committed value in the store so a list can highlight it.
    pub async fn expand(&self, id: NodeId) -> Vec<RecordIndex> {
        let Some((store, value_field, ids)) = self.read(|tree| {
            let field = tree.field(id)?;
            let state = field.selection()?;
            Some((
                Rc::clone(&state.store),
                state.value_field.clone(),
                resolve::normalize(&field.get_value(), state.multiple),
            ))
        }) else {
            return Vec::new();
        };
        let indices = resolve::locate_indices(store.as_ref(), &value_field, &ids).await;
        self.update(|tree| {
            if let Some(state) = tree.field_mut(id).and_then(|field| field.selection_mut()) {
                state.highlighted = indices.clone();
            }
            tree.push_event(FormEvent::Expanded {
                field: id,
                indices: indices.clone(),
            });
        });
        indices
    }

    /// Applies `keyword` as the store filter; an empty keyword clears it.
    pub fn match_keyword(&self, id: NodeId, keyword: &str) {
        let Some((store, field, operator)) = self.read(|tree| {
            let state = tree.field(id)?.selection()?;
            Some((
                Rc::clone(&state.store),
                state.search_field.clone(),
                state.search_operator,
            ))
        }) else {
            return;
        };
        if keyword.is_empty() {
            store.reset_filter();
        } else {
            store.set_filter(&field, keyword, operator);
        }
    }

    /// Commits the rows currently selected in the list.
    pub fn apply_selection(&self, id: NodeId, selected: Vec<Record>) -> bool {
        self.update(|tree| {
            let Some(state) = tree.field_mut(id).and_then(|field| field.selection_mut()) else {
                return false;
            };
            let ids = selected
                .iter()
                .filter_map(|record| record.get(&state.value_field).cloned())
                .collect::<Vec<_>>();
            let value = match ids.len() {
                0 => Value::Null,
                1 if !state.multiple => ids[0].clone(),
                _ => Value::Array(ids),
            };
            state.raw_value = value.clone();
            state.generation += 1;
            state.records = selected;
            tree.set_value(id, value, false)
        })
    }
}
