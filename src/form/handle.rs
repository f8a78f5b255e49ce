use std::{cell::RefCell, rc::Rc};

use serde_json::{Map, Value};

use crate::options::FormOptions;

use super::events::FormEvent;
use super::tree::{FormTree, NodeId};

type Listener = Rc<dyn Fn(&FormEvent)>;

/// Shared access to a [`FormTree`].
///
/// Async operations go through the handle and never hold the tree across
/// an await. Events queued by a mutation reach listeners once the borrow is
/// released, so a listener may read the form again.
#[derive(Clone)]
pub struct FormHandle {
    tree: Rc<RefCell<FormTree>>,
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl std::fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormHandle")
            .field("tree", &self.tree)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl Default for FormHandle {
    fn default() -> Self {
        Self::new(FormTree::default())
    }
}

impl FormHandle {
    pub fn new(tree: FormTree) -> Self {
        Self {
            tree: Rc::new(RefCell::new(tree)),
            listeners: Rc::default(),
        }
    }

    pub fn with_options(options: FormOptions) -> Self {
        Self::new(FormTree::new(options))
    }

    pub fn subscribe(&self, listener: impl Fn(&FormEvent) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Subscribes a listener that records every event.
    pub fn event_log(&self) -> Rc<RefCell<Vec<FormEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        self.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        log
    }

    pub fn read<R>(&self, f: impl FnOnce(&FormTree) -> R) -> R {
        f(&self.tree.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut FormTree) -> R) -> R {
        let result = f(&mut self.tree.borrow_mut());
        self.flush();
        result
    }

    fn flush(&self) {
        let events = self.tree.borrow_mut().take_events();
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.borrow().clone();
        for event in &events {
            for listener in &listeners {
                listener(event);
            }
        }
    }

    pub fn get_value(&self, id: NodeId) -> Value {
        self.read(|tree| tree.get_value(id))
    }

    pub fn get_values(&self) -> Map<String, Value> {
        self.read(FormTree::get_values)
    }

    pub fn has_error(&self, id: NodeId) -> bool {
        self.read(|tree| tree.has_error(id))
    }

    pub fn field_by_name(&self, name: &str) -> Option<NodeId> {
        self.read(|tree| tree.field_by_name(name))
    }

    /// Sets a field's value; selection fields resolve through their store
    /// before committing.
    pub async fn set_value(&self, id: NodeId, value: Value, is_origin: bool) -> bool {
        let is_selection = self.read(|tree| {
            tree.field(id)
                .is_some_and(|field| field.selection().is_some())
        });
        if is_selection {
            self.set_selection_value(id, value, is_origin).await
        } else {
            self.update(|tree| tree.set_value(id, value, is_origin))
        }
    }

    pub fn set_error(&self, id: NodeId, is_error: bool, message: Option<String>) {
        self.update(|tree| tree.set_error(id, is_error, message));
    }

    pub fn set_disabled(&self, id: NodeId, disabled: bool) {
        self.update(|tree| tree.set_disabled(id, disabled));
    }

    pub fn rollback(&self, id: NodeId) {
        self.update(|tree| tree.rollback(id));
    }

    pub fn remove(&self, id: NodeId) -> bool {
        self.update(|tree| tree.remove(id))
    }
}
