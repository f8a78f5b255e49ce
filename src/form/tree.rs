use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::options::{FormOptions, LayoutDefaults};

use super::composite::CompositeState;
use super::error::DefinitionError;
use super::events::FormEvent;
use super::field::{FieldConfig, FieldRole, FieldState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Field(FieldState),
    Container(CompositeState),
    FieldSet(CompositeState),
    /// Presentational child with no form semantics; skipped by traversal.
    Opaque,
}

impl NodeKind {
    pub fn is_field(&self) -> bool {
        matches!(self, NodeKind::Field(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Container(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, NodeKind::Container(_) | NodeKind::FieldSet(_))
    }
}

#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) label: Option<String>,
    pub(crate) layout: LayoutDefaults,
    pub(crate) disabled: bool,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn layout(&self) -> &LayoutDefaults {
        &self.layout
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// Composite construction settings.
#[derive(Debug, Clone, Default)]
pub struct CompositeConfig {
    pub label: Option<String>,
    pub layout: LayoutDefaults,
    pub disabled: bool,
}

impl CompositeConfig {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: LayoutDefaults) -> Self {
        self.layout = layout;
        self
    }
}

/// Radio-style group membership, keyed by group name.
#[derive(Debug, Default)]
pub(crate) struct GroupRegistry {
    groups: HashMap<String, Vec<NodeId>>,
}

impl GroupRegistry {
    fn insert(&mut self, group: &str, id: NodeId) {
        self.groups.entry(group.to_string()).or_default().push(id);
    }

    fn remove(&mut self, group: &str, id: NodeId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.retain(|member| *member != id);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    pub(crate) fn members(&self, group: &str) -> &[NodeId] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Arena holding the whole field tree.
#[derive(Debug, Default)]
pub struct FormTree {
    nodes: Vec<Option<Node>>,
    roots: Vec<NodeId>,
    names: HashMap<String, NodeId>,
    pub(crate) groups: GroupRegistry,
    pub(crate) options: FormOptions,
    defaults_applied: bool,
    outbox: Vec<FormEvent>,
}

impl FormTree {
    pub fn new(options: FormOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn field(&self, id: NodeId) -> Option<&FieldState> {
        match &self.node(id)?.kind {
            NodeKind::Field(field) => Some(field),
            _ => None,
        }
    }

    pub(crate) fn field_mut(&mut self, id: NodeId) -> Option<&mut FieldState> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn field_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.disabled)
    }

    pub(crate) fn push_event(&mut self, event: FormEvent) {
        self.outbox.push(event);
    }

    /// Drains events queued by mutations since the last call.
    pub fn take_events(&mut self) -> Vec<FormEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn add_field(
        &mut self,
        parent: Option<NodeId>,
        config: FieldConfig,
    ) -> Result<NodeId, DefinitionError> {
        if self.names.contains_key(&config.name) {
            return Err(DefinitionError::DuplicateName(config.name));
        }
        let (state, parts) = FieldState::from_config(config);
        let name = state.name.clone();
        let group = match &state.role {
            FieldRole::Radio { group, .. } => Some(group.clone()),
            _ => None,
        };
        let allow_blank = state.allow_blank;
        let id = self.attach(
            parent,
            parts.label,
            parts.layout,
            parts.disabled,
            NodeKind::Field(state),
        )?;
        self.names.insert(name, id);
        if let Some(group) = group {
            self.groups.insert(&group, id);
        }
        self.register_allow_blank(parent, allow_blank);
        Ok(id)
    }

    pub fn add_container(
        &mut self,
        parent: Option<NodeId>,
        config: CompositeConfig,
    ) -> Result<NodeId, DefinitionError> {
        self.attach(
            parent,
            config.label,
            config.layout,
            config.disabled,
            NodeKind::Container(CompositeState::default()),
        )
    }

    pub fn add_fieldset(
        &mut self,
        parent: Option<NodeId>,
        config: CompositeConfig,
    ) -> Result<NodeId, DefinitionError> {
        self.attach(
            parent,
            config.label,
            config.layout,
            config.disabled,
            NodeKind::FieldSet(CompositeState::default()),
        )
    }

    pub fn add_opaque(
        &mut self,
        parent: Option<NodeId>,
        label: Option<String>,
    ) -> Result<NodeId, DefinitionError> {
        self.attach(
            parent,
            label,
            LayoutDefaults::default(),
            false,
            NodeKind::Opaque,
        )
    }

    /// Attaches a field under another field. Only used for sub-fields such as
    /// a selection's search box; they stay out of `get_fields`.
    pub(crate) fn add_sub_field(
        &mut self,
        owner: NodeId,
        config: FieldConfig,
    ) -> Result<NodeId, DefinitionError> {
        if self.field(owner).is_none() {
            return Err(DefinitionError::InvalidParent(owner));
        }
        if self.names.contains_key(&config.name) {
            return Err(DefinitionError::DuplicateName(config.name));
        }
        let (state, parts) = FieldState::from_config(config);
        let name = state.name.clone();
        let id = self.push_node(
            Some(owner),
            parts.label,
            parts.layout,
            parts.disabled,
            NodeKind::Field(state),
        );
        self.names.insert(name, id);
        Ok(id)
    }

    fn attach(
        &mut self,
        parent: Option<NodeId>,
        label: Option<String>,
        layout: LayoutDefaults,
        disabled: bool,
        kind: NodeKind,
    ) -> Result<NodeId, DefinitionError> {
        if let Some(parent) = parent {
            let node = self
                .node(parent)
                .ok_or(DefinitionError::UnknownNode(parent))?;
            if !node.kind.is_composite() {
                return Err(DefinitionError::InvalidParent(parent));
            }
        }
        Ok(self.push_node(parent, label, layout, disabled, kind))
    }

    fn push_node(
        &mut self,
        parent: Option<NodeId>,
        label: Option<String>,
        mut layout: LayoutDefaults,
        disabled: bool,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        if self.defaults_applied {
            let inherited = match parent.and_then(|parent| self.node(parent)) {
                Some(node) => node.layout.clone(),
                None => self.options.defaults.clone(),
            };
            layout.inherit(&inherited);
        }
        let disabled = disabled || parent.is_some_and(|parent| self.is_disabled(parent));
        self.nodes.push(Some(Node {
            id,
            parent,
            children: Vec::new(),
            label,
            layout,
            disabled,
            kind,
        }));
        match parent.and_then(|parent| self.node_mut(parent)) {
            Some(node) => node.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Folds a new child's blank policy into every composite above it.
    fn register_allow_blank(&mut self, mut parent: Option<NodeId>, allow_blank: bool) {
        while let Some(id) = parent {
            let Some(node) = self.node_mut(id) else {
                return;
            };
            match &mut node.kind {
                NodeKind::Container(state) | NodeKind::FieldSet(state) => {
                    state.allow_blank &= allow_blank;
                }
                _ => return,
            }
            parent = node.parent;
        }
    }

    /// Detaches `id` and its subtree, dropping registry entries.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        match node.parent {
            Some(parent) => {
                if let Some(parent) = self.node_mut(parent) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) else {
                continue;
            };
            pending.extend(node.children.iter().copied());
            if let NodeKind::Field(field) = &node.kind {
                if self.names.get(&field.name) == Some(&current) {
                    self.names.remove(&field.name);
                }
                if let FieldRole::Radio { group, .. } = &field.role {
                    self.groups.remove(group, current);
                }
            }
        }
        debug!(node = %id, "detached node");
        true
    }

    /// Depth-first leaf fields of the whole tree, in document order.
    pub fn get_fields(&self) -> Vec<NodeId> {
        let mut fields = Vec::new();
        for root in &self.roots {
            self.collect_fields(*root, &mut fields);
        }
        fields
    }

    /// Leaf fields under `id`; a field yields itself.
    pub fn fields_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut fields = Vec::new();
        self.collect_fields(id, &mut fields);
        fields
    }

    fn collect_fields(&self, id: NodeId, acc: &mut Vec<NodeId>) {
        let Some(node) = self.node(id) else {
            return;
        };
        match node.kind {
            NodeKind::Field(_) => acc.push(id),
            NodeKind::Container(_) | NodeKind::FieldSet(_) => {
                for child in &node.children {
                    self.collect_fields(*child, acc);
                }
            }
            NodeKind::Opaque => {}
        }
    }

    /// Blank policy of a field, or the aggregated policy of a composite.
    pub fn allow_blank(&self, id: NodeId) -> bool {
        match self.node(id).map(|node| &node.kind) {
            Some(NodeKind::Field(field)) => field.allow_blank,
            Some(NodeKind::Container(state)) | Some(NodeKind::FieldSet(state)) => {
                state.allow_blank
            }
            _ => true,
        }
    }

    /// Propagates layout defaults down the tree. Runs once; later
    /// attachments inherit on their own.
    pub fn set_defaults(&mut self) {
        if self.defaults_applied {
            return;
        }
        let base = self.options.defaults.clone();
        for root in self.roots.clone() {
            self.apply_defaults(root, &base);
        }
        self.defaults_applied = true;
    }

    fn apply_defaults(&mut self, id: NodeId, inherited: &LayoutDefaults) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.layout.inherit(inherited);
        if !node.kind.is_composite() {
            return;
        }
        let layout = node.layout.clone();
        for child in node.children.clone() {
            self.apply_defaults(child, &layout);
        }
    }

    /// Toggles disablement, cascading through composites. A field whose
    /// parent is not itself a field fires a change, since disabled fields
    /// drop out of the collected values.
    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let was = std::mem::replace(&mut node.disabled, disabled);
        let parent = node.parent;
        let children = node.children.clone();
        let field_value = match &node.kind {
            NodeKind::Field(field) => Some(field.get_value()),
            _ => None,
        };
        if let Some(value) = field_value {
            let parent_is_field = parent
                .and_then(|parent| self.node(parent))
                .is_some_and(|node| node.kind.is_field());
            if was != disabled && !parent_is_field {
                self.push_event(FormEvent::Change {
                    field: id,
                    value: value.clone(),
                    previous: value,
                });
            }
        }
        for child in children {
            self.set_disabled(child, disabled);
        }
    }

    pub fn get_value(&self, id: NodeId) -> Value {
        self.field(id).map(FieldState::get_value).unwrap_or(Value::Null)
    }

    /// Commits a value on a field, queueing a change event when observable.
    /// Selection fields should go through `FormHandle::set_value` to resolve.
    pub fn set_value(&mut self, id: NodeId, value: Value, is_origin: bool) -> bool {
        let Some(field) = self.field_mut(id) else {
            return false;
        };
        match field.commit(value.clone(), is_origin) {
            Some(previous) => {
                self.push_event(FormEvent::Change {
                    field: id,
                    value,
                    previous,
                });
                true
            }
            None => false,
        }
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.fields_under(id)
            .into_iter()
            .filter_map(|field| self.field(field))
            .any(FieldState::is_dirty)
    }

    pub fn is_form_dirty(&self) -> bool {
        self.get_fields()
            .into_iter()
            .filter_map(|field| self.field(field))
            .any(FieldState::is_dirty)
    }

    /// Restores the origin value of every dirty field under `id`.
    ///
    /// A selection counts the rollback as its newest request, so a
    /// resolution still in flight is dropped when it settles.
    pub fn rollback(&mut self, id: NodeId) {
        for field_id in self.fields_under(id) {
            let Some(field) = self.field_mut(field_id) else {
                continue;
            };
            let origin = field.origin_value();
            let dirty = field.is_dirty();
            if let Some(state) = field.selection_mut() {
                state.raw_value = origin.clone();
                state.generation += 1;
            }
            if dirty {
                self.set_value(field_id, origin, false);
            }
        }
    }

    pub fn rollback_all(&mut self) {
        for root in self.roots.clone() {
            self.rollback(root);
        }
    }

    pub fn has_error(&self, id: NodeId) -> bool {
        self.field(id).is_some_and(FieldState::has_error)
    }

    /// Values contributed by `id`: a field's own entry, or the merge of
    /// every leaf under a composite (last write wins on duplicates).
    pub fn values_of(&self, id: NodeId) -> Map<String, Value> {
        let mut merged = Map::new();
        for field_id in self.fields_under(id) {
            if let Some(field) = self.field(field_id) {
                merged.extend(field.values(self.is_disabled(field_id)));
            }
        }
        merged
    }

    pub fn get_values(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for root in &self.roots {
            merged.extend(self.values_of(*root));
        }
        merged
    }

    /// Checks a radio member and clears every other member of its group.
    pub fn check(&mut self, id: NodeId) -> bool {
        let Some(FieldRole::Radio { group, option }) = self.field(id).map(|field| &field.role)
        else {
            return false;
        };
        let group = group.clone();
        let option = option.clone();
        let siblings = self.groups.members(&group).to_vec();
        for sibling in siblings {
            if sibling != id {
                self.set_value(sibling, Value::Null, false);
            }
        }
        self.set_value(id, option, false)
    }

    /// The checked member of a radio group, if any.
    pub fn checked_in_group(&self, group: &str) -> Option<NodeId> {
        self.groups
            .members(group)
            .iter()
            .copied()
            .find(|member| !self.get_value(*member).is_null())
    }
}
