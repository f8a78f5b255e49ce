use std::{cell::Cell, rc::Rc, time::Duration};

use anyhow::{Result, anyhow};
use futures::executor::block_on;
use futures::future::LocalBoxFuture;
use serde_json::{Value, json};

use super::{add_selection, people, ready_people, selection_of};
use crate::form::{FormEvent, FormHandle};
use crate::store::{MemoryStore, Record, RecordIndex, RecordLoader, Store, TreeNode, TreeStore};
use crate::tests::record;

fn counting_store() -> Rc<MemoryStore> {
    let loader: RecordLoader = Rc::new(ready_people);
    Rc::new(MemoryStore::with_loader(loader))
}

#[test]
fn multi_select_keeps_requested_order_with_one_reload() {
    let store = counting_store();
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store.clone(), true));

    assert!(block_on(form.set_value(id, json!(["b", "a", "c"]), false)));

    assert_eq!(form.get_value(id), json!(["b", "a", "c"]));
    assert_eq!(store.load_count(), 1);
    assert_eq!(
        form.read(|tree| tree.field(id).unwrap().selection().unwrap().display_text()),
        "Bob, Ann, Cid"
    );
}

#[test]
fn single_mode_resolves_the_last_requested_id() {
    let store: Rc<dyn Store> = Rc::new(MemoryStore::new(people()));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false));

    block_on(form.set_value(id, json!(["a", "b"]), false));
    assert_eq!(form.get_value(id), json!("b"));
}

#[test]
fn unknown_ids_resolve_to_null() {
    let store: Rc<dyn Store> = Rc::new(MemoryStore::new(people()));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, true));

    block_on(form.set_value(id, json!(["zzz", "a"]), false));
    assert_eq!(form.get_value(id), json!(["a"]));

    assert!(block_on(form.set_value(id, json!("missing"), false)));
    assert!(form.get_value(id).is_null());
}

#[test]
fn origin_values_through_selection_stay_clean() {
    let store: Rc<dyn Store> = Rc::new(MemoryStore::new(people()));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false));
    block_on(form.set_value(id, json!("c"), true));
    assert_eq!(form.get_value(id), json!("c"));
    assert!(!form.read(|tree| tree.is_dirty(id)));
}

#[test]
fn rejected_reload_counts_as_absent() {
    let loader: RecordLoader = Rc::new(|| {
        Box::pin(async { Err(anyhow!("backend down")) })
            as LocalBoxFuture<'static, Result<Vec<Record>>>
    });
    let store: Rc<dyn Store> = Rc::new(MemoryStore::with_loader(loader));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false));

    assert!(!block_on(form.set_value(id, json!("a"), false)));
    assert!(form.get_value(id).is_null());
    assert_eq!(
        form.read(|tree| tree.field(id).unwrap().selection().unwrap().raw_value().clone()),
        json!("a")
    );
}

fn regions() -> TreeStore {
    TreeStore::new(
        "id",
        vec![
            TreeNode::with_children(
                record(json!({"id": "eu", "name": "Europe"})),
                vec![TreeNode::with_children(
                    record(json!({"id": "de", "name": "Germany"})),
                    vec![TreeNode::leaf(record(json!({"id": "ber", "name": "Berlin"})))],
                )],
            ),
            TreeNode::leaf(record(json!({"id": "us", "name": "USA"}))),
        ],
    )
}

#[test]
fn hierarchical_ids_resolve_through_ancestor_walk() {
    let store = Rc::new(regions());
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store.clone(), false));
    let log = form.event_log();

    assert!(block_on(form.set_value(id, json!("ber"), false)));
    assert_eq!(form.get_value(id), json!("ber"));
    assert!(store.is_expanded(&record(json!({"id": "de"}))));

    let indices = block_on(form.expand(id));
    assert_eq!(indices, vec![RecordIndex::Path(vec![0, 0, 0])]);
    assert_eq!(indices[0].deepest(), Some(0));
    assert_eq!(
        log.borrow().last(),
        Some(&FormEvent::Expanded {
            field: id,
            indices: indices.clone(),
        })
    );
}

#[test]
fn expand_walks_ancestors_again_after_collapse() {
    let store = Rc::new(regions());
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store.clone(), true));
    block_on(form.set_value(id, json!(["us", "ber"]), false));
    store.collapse_all();

    let indices = block_on(form.expand(id));

    assert_eq!(
        indices,
        vec![RecordIndex::Path(vec![1]), RecordIndex::Path(vec![0, 0, 0])]
    );
    assert_eq!(
        form.read(|tree| tree.field(id).unwrap().selection().unwrap().highlighted().len()),
        2
    );
}

#[test]
fn list_picks_commit_ids_in_pick_order() {
    let store: Rc<dyn Store> = Rc::new(MemoryStore::new(people()));
    let form = FormHandle::default();
    let multi = add_selection(&form, selection_of(store.clone(), true));
    let picks = people();

    assert!(form.apply_selection(multi, vec![picks[1].clone(), picks[0].clone()]));
    assert_eq!(form.get_value(multi), json!(["b", "a"]));

    assert!(form.apply_selection(multi, Vec::new()));
    assert_eq!(form.get_value(multi), Value::Null);
}

#[test]
fn searchable_selection_hides_its_search_box() {
    let store: Rc<dyn Store> = Rc::new(MemoryStore::new(people()));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false).searchable(true));
    let search_box = form
        .read(|tree| tree.field(id).unwrap().selection().unwrap().search_box())
        .unwrap();

    form.update(|tree| tree.set_value(search_box, json!("typed"), false));
    block_on(form.set_value(id, json!("a"), false));

    assert_eq!(form.read(|tree| tree.get_fields()), vec![id]);
    assert_eq!(Value::Object(form.get_values()), json!({"who": "a"}));
    assert_eq!(form.field_by_name("who-search"), Some(search_box));

    assert!(form.remove(id));
    assert_eq!(form.field_by_name("who-search"), None);
}

#[tokio::test]
async fn raw_value_is_visible_while_resolving() {
    let loader: RecordLoader = Rc::new(|| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(people())
        }) as LocalBoxFuture<'static, Result<Vec<Record>>>
    });
    let store: Rc<dyn Store> = Rc::new(MemoryStore::with_loader(loader));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false));

    let mut pending = Box::pin(form.set_value(id, json!("b"), false));
    assert!(futures::poll!(&mut pending).is_pending());
    assert_eq!(
        form.read(|tree| tree.field(id).unwrap().selection().unwrap().raw_value().clone()),
        json!("b")
    );
    assert!(form.get_value(id).is_null());

    assert!(pending.await);
    assert_eq!(form.get_value(id), json!("b"));
}

#[tokio::test]
async fn older_resolution_finishing_last_is_dropped() {
    let calls = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&calls);
    let loader: RecordLoader = Rc::new(move || {
        let call = counter.get();
        counter.set(call + 1);
        let delay = if call == 0 { 30 } else { 5 };
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(people())
        }) as LocalBoxFuture<'static, Result<Vec<Record>>>
    });
    let store: Rc<dyn Store> = Rc::new(MemoryStore::with_loader(loader));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false));

    let (first, second) = futures::join!(
        form.set_value(id, json!("a"), false),
        form.set_value(id, json!("c"), false)
    );

    assert!(!first);
    assert!(second);
    assert_eq!(calls.get(), 2);
    assert_eq!(form.get_value(id), json!("c"));
}

#[tokio::test]
async fn rollback_outranks_a_resolution_in_flight() {
    let loader: RecordLoader = Rc::new(|| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(people())
        }) as LocalBoxFuture<'static, Result<Vec<Record>>>
    });
    let store: Rc<dyn Store> = Rc::new(MemoryStore::with_loader(loader));
    let form = FormHandle::default();
    let id = add_selection(&form, selection_of(store, false));
    form.update(|tree| {
        tree.set_value(id, json!("a"), true);
        tree.set_value(id, json!("b"), false);
    });

    let (committed, ()) = futures::join!(form.set_value(id, json!("c"), false), async {
        form.rollback(id);
    });

    assert!(!committed);
    assert_eq!(form.get_value(id), json!("a"));
    assert!(!form.read(|tree| tree.is_dirty(id)));
    assert_eq!(
        form.read(|tree| tree.field(id).unwrap().selection().unwrap().raw_value().clone()),
        json!("a")
    );
}
