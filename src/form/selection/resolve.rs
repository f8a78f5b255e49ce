use futures::future::{FutureExt, LocalBoxFuture, Shared, join_all};
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::{Record, RecordIndex, Store, lookup};

type SharedReload<'a> = Shared<LocalBoxFuture<'a, bool>>;

/// Coerces a raw value into the list of ids to resolve.
pub(crate) fn normalize(raw: &Value, multiple: bool) -> Vec<Value> {
    match raw {
        Value::Null => Vec::new(),
        Value::Array(items) if multiple => {
            items.iter().filter(|item| !item.is_null()).cloned().collect()
        }
        Value::Array(items) => items
            .last()
            .filter(|item| !item.is_null())
            .cloned()
            .into_iter()
            .collect(),
        other => vec![other.clone()],
    }
}

/// Shape the committed value from resolved ids.
pub(crate) fn aggregate(ids: Vec<Value>, multiple: bool) -> Value {
    if multiple {
        if ids.is_empty() {
            Value::Null
        } else {
            Value::Array(ids)
        }
    } else {
        ids.into_iter().next().unwrap_or(Value::Null)
    }
}

/// One reload per pass, shared by every id that needs it.
fn shared_reload(store: &dyn Store) -> SharedReload<'_> {
    let reload: LocalBoxFuture<'_, bool> = Box::pin(async move {
        match store.reload().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "store reload failed during resolution");
                false
            }
        }
    });
    reload.shared()
}

/// Resolves every id concurrently; the result keeps input order.
pub(crate) async fn resolve_records(
    store: &dyn Store,
    value_field: &str,
    ids: &[Value],
) -> Vec<Option<Record>> {
    let reload = shared_reload(store);
    join_all(
        ids.iter()
            .map(|id| resolve_one(store, value_field, id, reload.clone())),
    )
    .await
}

async fn resolve_one(
    store: &dyn Store,
    value_field: &str,
    id: &Value,
    reload: SharedReload<'_>,
) -> Option<Record> {
    let partial = lookup(value_field, id);
    if let Some(record) = store.find(&partial) {
        return Some(record);
    }
    if !store.is_loaded() {
        if !reload.await {
            return None;
        }
        if let Some(record) = store.find(&partial) {
            return Some(record);
        }
    }
    let hierarchy = store.hierarchy()?;
    match hierarchy.get_parents(&partial).await {
        Ok(Some(chain)) => {
            debug!(%id, depth = chain.len(), "retrying lookup after ancestor walk");
            store.find(&partial)
        }
        Ok(None) => {
            debug!(%id, "id not present in hierarchy");
            None
        }
        Err(err) => {
            warn!(%id, error = %err, "ancestor walk failed during resolution");
            None
        }
    }
}

/// List positions of `ids`, walking ancestors where needed.
pub(crate) async fn locate_indices(
    store: &dyn Store,
    value_field: &str,
    ids: &[Value],
) -> Vec<RecordIndex> {
    let reload = shared_reload(store);
    let located = join_all(ids.iter().map(|id| {
        let reload = reload.clone();
        async move {
            let partial = lookup(value_field, id);
            if let Some(index) = store.find_index(&partial) {
                return Some(index);
            }
            if !store.is_loaded() && reload.await {
                if let Some(index) = store.find_index(&partial) {
                    return Some(index);
                }
            }
            let hierarchy = store.hierarchy()?;
            match hierarchy.get_parents(&partial).await {
                Ok(Some(_)) => store.find_index(&partial),
                Ok(None) => None,
                Err(err) => {
                    warn!(%id, error = %err, "ancestor walk failed while expanding");
                    None
                }
            }
        }
    }))
    .await;
    located.into_iter().flatten().collect()
}
