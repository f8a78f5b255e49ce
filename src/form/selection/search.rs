use std::rc::Rc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::form::handle::FormHandle;
use crate::form::tree::NodeId;

/// Coalescing guard for type-ahead searches.
///
/// At most one search runs at a time. A keyword arriving meanwhile is
/// parked and run once the current search finishes, if it still differs
/// from the last completed keyword. Only the newest parked keyword is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub(crate) searching: bool,
    pub(crate) last_keyword: Option<String>,
    pub(crate) pending: Option<String>,
}

impl SearchState {
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn last_keyword(&self) -> Option<&str> {
        self.last_keyword.as_deref()
    }
}

impl FormHandle {
    /// Filters and reloads the selection's store for `keyword`.
    pub async fn search(&self, id: NodeId, keyword: impl Into<String>) -> Result<()> {
        let keyword = keyword.into();
        let started = self.update(|tree| {
            let search_box = tree.field(id)?.selection()?.search_box;
            if let Some(search_box) = search_box {
                tree.set_value(search_box, Value::String(keyword.clone()), false);
            }
            let state = tree.field_mut(id)?.selection_mut()?;
            if state.search.searching {
                state.search.pending = Some(keyword.clone());
                return None;
            }
            if state.search.last_keyword.as_deref() == Some(keyword.as_str()) {
                return None;
            }
            state.search.searching = true;
            Some((
                Rc::clone(&state.store),
                state.search_field.clone(),
                state.search_operator,
            ))
        });
        let Some((store, field, operator)) = started else {
            debug!(field = %id, %keyword, "search coalesced");
            return Ok(());
        };

        let mut keyword = keyword;
        loop {
            if keyword.is_empty() {
                store.reset_filter();
            } else {
                store.set_filter(&field, &keyword, operator);
            }
            let result = store.load().await;
            let next = self.update(|tree| {
                let state = tree.field_mut(id)?.selection_mut()?;
                state.search.last_keyword = Some(keyword.clone());
                match state.search.pending.take() {
                    Some(pending) if pending != keyword => Some(pending),
                    _ => {
                        state.search.searching = false;
                        None
                    }
                }
            });
            if let Err(err) = result {
                if next.is_none() {
                    return Err(err);
                }
                warn!(field = %id, %keyword, error = %err, "search load failed");
            }
            match next {
                Some(pending) => keyword = pending,
                None => return Ok(()),
            }
        }
    }
}
