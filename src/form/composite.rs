use indexmap::IndexMap;

use super::events::FormEvent;
use super::tree::{FormTree, NodeId, NodeKind};

/// One child's contribution to a composite's merged help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub is_error: bool,
    pub message: Option<String>,
}

/// Aggregation state shared by containers and field sets.
#[derive(Debug, Clone)]
pub struct CompositeState {
    pub(crate) allow_blank: bool,
    pub(crate) errors: IndexMap<NodeId, ErrorEntry>,
    pub(crate) help: Option<String>,
}

impl Default for CompositeState {
    fn default() -> Self {
        Self {
            allow_blank: true,
            errors: IndexMap::new(),
            help: None,
        }
    }
}

impl CompositeState {
    pub fn allows_blank(&self) -> bool {
        self.allow_blank
    }

    pub fn errors(&self) -> &IndexMap<NodeId, ErrorEntry> {
        &self.errors
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn has_active_error(&self) -> bool {
        self.errors.values().any(|entry| entry.is_error)
    }

    fn record(&mut self, child: NodeId, is_error: bool, message: Option<String>) {
        self.errors.insert(child, ErrorEntry { is_error, message });
        let messages = self
            .errors
            .values()
            .filter(|entry| entry.is_error)
            .filter_map(|entry| entry.message.as_deref())
            .collect::<Vec<_>>();
        self.help = if messages.is_empty() {
            None
        } else {
            Some(messages.join("\n"))
        };
    }
}

impl FormTree {
    pub fn composite(&self, id: NodeId) -> Option<&CompositeState> {
        match &self.node(id)?.kind {
            NodeKind::Container(state) | NodeKind::FieldSet(state) => Some(state),
            _ => None,
        }
    }

    /// Visible help text of a field or container.
    pub fn help_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Field(field) => field.help_text(),
            NodeKind::Container(state) | NodeKind::FieldSet(state) => state.help_text(),
            NodeKind::Opaque => None,
        }
    }

    /// Flags a field as erroneous (or clears it). Inside a container that
    /// is labeled, or sits under a labeled container, the message is shown
    /// by that container instead of the field.
    pub fn set_error(&mut self, id: NodeId, is_error: bool, message: Option<String>) {
        let delegate = self
            .parent(id)
            .filter(|parent| self.shows_child_errors(*parent));
        if self.node(id).is_some_and(|node| node.kind.is_container()) {
            if let Some(container) = delegate {
                self.set_child_error(container, id, is_error, message);
            }
            return;
        }
        let Some(field) = self.field_mut(id) else {
            return;
        };
        field.error_visible = is_error;
        match delegate {
            Some(container) => {
                field.help = None;
                self.set_child_error(container, id, is_error, message);
            }
            None => {
                field.help = if is_error { message } else { None };
                let help = field.help.clone();
                self.push_event(FormEvent::ErrorChanged { node: id, help });
            }
        }
    }

    /// Records `child`'s error on `container`. An unlabeled container with a
    /// labeled container above it forwards upward, re-keyed by its own id.
    pub fn set_child_error(
        &mut self,
        container: NodeId,
        child: NodeId,
        is_error: bool,
        message: Option<String>,
    ) {
        let Some(node) = self.node(container) else {
            return;
        };
        if !node.kind.is_container() {
            return;
        }
        if node.label.is_none() && self.has_labeled_container_above(container) {
            if let Some(parent) = node.parent {
                self.set_child_error(parent, container, is_error, message);
            }
            return;
        }
        let Some(NodeKind::Container(state)) = self.node_mut(container).map(|node| &mut node.kind)
        else {
            return;
        };
        state.record(child, is_error, message);
        let help = state.help.clone();
        self.push_event(FormEvent::ErrorChanged {
            node: container,
            help,
        });
    }

    fn shows_child_errors(&self, container: NodeId) -> bool {
        self.node(container).is_some_and(|node| {
            node.kind.is_container()
                && (node.label.is_some() || self.has_labeled_container_above(container))
        })
    }

    fn has_labeled_container_above(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            let Some(node) = self.node(ancestor) else {
                return false;
            };
            if !node.kind.is_container() {
                return false;
            }
            if node.label.is_some() {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Clears visible errors and cached validation results everywhere.
    pub fn clear_errors(&mut self) {
        for id in self.get_fields() {
            if let Some(field) = self.field_mut(id) {
                field.validation_result = Default::default();
            }
            self.set_error(id, false, None);
        }
    }
}
