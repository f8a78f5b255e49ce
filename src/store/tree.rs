use std::{cell::RefCell, collections::HashSet};

use anyhow::Result;
use futures::future::{self, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Filter, FilterOperator, Hierarchical, Record, RecordIndex, Store, matches_partial};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub record: Record,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(record: Record) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    pub fn with_children(record: Record, children: Vec<TreeNode>) -> Self {
        Self { record, children }
    }
}

#[derive(Debug, Default)]
struct TreeInner {
    roots: Vec<TreeNode>,
    expanded: HashSet<String>,
    loaded: bool,
    filter: Option<Filter>,
    loads: usize,
}

/// Hierarchical store where only expanded branches are visible.
///
/// Roots are always visible; children show up once their parent is
/// expanded, either explicitly or through [`Hierarchical::get_parents`].
#[derive(Debug)]
pub struct TreeStore {
    id_field: String,
    pending: RefCell<Option<Vec<TreeNode>>>,
    inner: RefCell<TreeInner>,
}

impl TreeStore {
    pub fn new(id_field: impl Into<String>, roots: Vec<TreeNode>) -> Self {
        Self {
            id_field: id_field.into(),
            pending: RefCell::new(None),
            inner: RefCell::new(TreeInner {
                roots,
                loaded: true,
                ..TreeInner::default()
            }),
        }
    }

    /// A store whose records only arrive on the first load.
    pub fn deferred(id_field: impl Into<String>, roots: Vec<TreeNode>) -> Self {
        Self {
            id_field: id_field.into(),
            pending: RefCell::new(Some(roots)),
            inner: RefCell::default(),
        }
    }

    pub fn load_count(&self) -> usize {
        self.inner.borrow().loads
    }

    fn key(&self, record: &Record) -> Option<String> {
        record.get(&self.id_field).map(ToString::to_string)
    }

    pub fn expand(&self, record: &Record) {
        if let Some(key) = self.key(record) {
            self.inner.borrow_mut().expanded.insert(key);
        }
    }

    pub fn collapse_all(&self) {
        self.inner.borrow_mut().expanded.clear();
    }

    pub fn is_expanded(&self, record: &Record) -> bool {
        self.key(record)
            .is_some_and(|key| self.inner.borrow().expanded.contains(&key))
    }

    /// First visible record matching `partial`, with its index path.
    fn locate(&self, partial: &Record) -> Option<(Record, Vec<usize>)> {
        let inner = self.inner.borrow();
        let mut path = Vec::new();
        self.walk_visible(&inner, &inner.roots, partial, &mut path)
    }

    fn walk_visible(
        &self,
        inner: &TreeInner,
        nodes: &[TreeNode],
        partial: &Record,
        path: &mut Vec<usize>,
    ) -> Option<(Record, Vec<usize>)> {
        let visible = nodes
            .iter()
            .filter(|node| inner.filter.as_ref().is_none_or(|filter| subtree_accepts(node, filter)));
        for (index, node) in visible.enumerate() {
            path.push(index);
            if matches_partial(&node.record, partial) {
                return Some((node.record.clone(), path.clone()));
            }
            let open = inner.filter.is_some()
                || self
                    .key(&node.record)
                    .is_some_and(|key| inner.expanded.contains(&key));
            if open {
                if let Some(found) = self.walk_visible(inner, &node.children, partial, path) {
                    return Some(found);
                }
            }
            path.pop();
        }
        None
    }

    async fn fetch(&self) -> Result<()> {
        let pending = self.pending.borrow_mut().take();
        let mut inner = self.inner.borrow_mut();
        if let Some(roots) = pending {
            inner.roots = roots;
        }
        inner.loaded = true;
        inner.loads += 1;
        debug!(roots = inner.roots.len(), loads = inner.loads, "tree store loaded");
        Ok(())
    }
}

fn subtree_accepts(node: &TreeNode, filter: &Filter) -> bool {
    filter.accepts(&node.record)
        || node
            .children
            .iter()
            .any(|child| subtree_accepts(child, filter))
}

/// Ancestor chain of the first node matching `partial`, ignoring expansion.
fn ancestors_of(nodes: &[TreeNode], partial: &Record, chain: &mut Vec<Record>) -> bool {
    for node in nodes {
        if matches_partial(&node.record, partial) {
            return true;
        }
        chain.push(node.record.clone());
        if ancestors_of(&node.children, partial, chain) {
            return true;
        }
        chain.pop();
    }
    false
}

impl Store for TreeStore {
    fn load(&self) -> LocalBoxFuture<'_, Result<()>> {
        Box::pin(self.fetch())
    }

    fn reload(&self) -> LocalBoxFuture<'_, Result<()>> {
        Box::pin(self.fetch())
    }

    fn is_loaded(&self) -> bool {
        self.inner.borrow().loaded
    }

    fn find(&self, partial: &Record) -> Option<Record> {
        self.locate(partial).map(|(record, _)| record)
    }

    fn find_index(&self, partial: &Record) -> Option<RecordIndex> {
        self.locate(partial).map(|(_, path)| RecordIndex::Path(path))
    }

    fn set_filter(&self, field: &str, keyword: &str, operator: FilterOperator) {
        self.inner.borrow_mut().filter = Some(Filter {
            field: field.to_string(),
            keyword: keyword.to_string(),
            operator,
        });
    }

    fn reset_filter(&self) {
        self.inner.borrow_mut().filter = None;
    }

    fn hierarchy(&self) -> Option<&dyn Hierarchical> {
        Some(self)
    }
}

impl Hierarchical for TreeStore {
    fn get_parents(&self, target: &Record) -> LocalBoxFuture<'_, Result<Option<Vec<Record>>>> {
        let mut chain = Vec::new();
        let found = ancestors_of(&self.inner.borrow().roots, target, &mut chain);
        if !found {
            return Box::pin(future::ready(Ok(None)));
        }
        for ancestor in &chain {
            self.expand(ancestor);
        }
        debug!(depth = chain.len(), "expanded ancestor chain");
        Box::pin(future::ready(Ok(Some(chain))))
    }
}
