use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use anyhow::{Result, anyhow};
use futures::future::LocalBoxFuture;
use serde_json::json;

use super::{add_selection, people};
use crate::form::{FormHandle, NodeId, SelectionState};
use crate::store::{FilterOperator, MemoryStore, Record, RecordIndex, Store};

/// Remote-style store: every load takes a while, filters are recorded.
#[derive(Default)]
struct SlowStore {
    filters: RefCell<Vec<Option<String>>>,
    loads: Cell<usize>,
    failing: Cell<bool>,
}

impl Store for SlowStore {
    fn load(&self) -> LocalBoxFuture<'_, Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.loads.set(self.loads.get() + 1);
            if self.failing.get() {
                Err(anyhow!("search endpoint unavailable"))
            } else {
                Ok(())
            }
        })
    }

    fn reload(&self) -> LocalBoxFuture<'_, Result<()>> {
        self.load()
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn find(&self, _partial: &Record) -> Option<Record> {
        None
    }

    fn find_index(&self, _partial: &Record) -> Option<RecordIndex> {
        None
    }

    fn set_filter(&self, _field: &str, keyword: &str, _operator: FilterOperator) {
        self.filters.borrow_mut().push(Some(keyword.to_string()));
    }

    fn reset_filter(&self) {
        self.filters.borrow_mut().push(None);
    }
}

fn searchable(form: &FormHandle, store: Rc<SlowStore>) -> NodeId {
    add_selection(form, SelectionState::new(store).searchable(true))
}

fn search_box_value(form: &FormHandle, id: NodeId) -> serde_json::Value {
    form.read(|tree| {
        let search_box = tree.field(id)?.selection()?.search_box()?;
        Some(tree.get_value(search_box))
    })
    .unwrap_or_default()
}

#[tokio::test]
async fn keywords_arriving_mid_search_coalesce_to_the_newest() {
    let store = Rc::new(SlowStore::default());
    let form = FormHandle::default();
    let id = searchable(&form, store.clone());

    let (a, ab, abc) = futures::join!(
        form.search(id, "a"),
        form.search(id, "ab"),
        form.search(id, "abc")
    );
    a.unwrap();
    ab.unwrap();
    abc.unwrap();

    assert_eq!(
        *store.filters.borrow(),
        vec![Some("a".to_string()), Some("abc".to_string())]
    );
    assert_eq!(store.loads.get(), 2);
    let state = form.read(|tree| tree.field(id).unwrap().selection().unwrap().search_state().clone());
    assert!(!state.is_searching());
    assert_eq!(state.last_keyword(), Some("abc"));
    assert_eq!(search_box_value(&form, id), json!("abc"));
}

#[tokio::test]
async fn unchanged_keyword_is_skipped() {
    let store = Rc::new(SlowStore::default());
    let form = FormHandle::default();
    let id = searchable(&form, store.clone());

    form.search(id, "ber").await.unwrap();
    form.search(id, "ber").await.unwrap();
    assert_eq!(store.loads.get(), 1);

    form.search(id, "").await.unwrap();
    assert_eq!(store.filters.borrow().last(), Some(&None));
    assert_eq!(store.loads.get(), 2);
}

#[tokio::test]
async fn parked_keyword_equal_to_the_finished_one_is_dropped() {
    let store = Rc::new(SlowStore::default());
    let form = FormHandle::default();
    let id = searchable(&form, store.clone());

    let (first, second) = futures::join!(form.search(id, "x"), form.search(id, "x"));
    first.unwrap();
    second.unwrap();
    assert_eq!(store.loads.get(), 1);
}

#[tokio::test]
async fn failed_search_reports_and_releases_the_guard() {
    let store = Rc::new(SlowStore::default());
    store.failing.set(true);
    let form = FormHandle::default();
    let id = searchable(&form, store.clone());

    assert!(form.search(id, "a").await.is_err());

    store.failing.set(false);
    form.search(id, "b").await.unwrap();
    assert_eq!(store.loads.get(), 2);
}

#[test]
fn match_keyword_filters_the_list() {
    let store = Rc::new(MemoryStore::new(people()));
    let form = FormHandle::default();
    let id = add_selection(
        &form,
        SelectionState::new(store.clone()).with_search("name", FilterOperator::StartsWith),
    );

    form.match_keyword(id, "Bo");
    assert_eq!(store.len(), 1);
    form.match_keyword(id, "");
    assert_eq!(store.len(), 3);
}
