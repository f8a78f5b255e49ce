use std::{cell::RefCell, rc::Rc};

use anyhow::Result;
use futures::future::LocalBoxFuture;
use tracing::debug;

use super::{Filter, FilterOperator, Record, RecordIndex, Store, matches_partial};

/// Produces a fresh set of records, e.g. from a remote endpoint.
pub type RecordLoader = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<Vec<Record>>>>;

#[derive(Debug, Default)]
struct MemoryInner {
    records: Vec<Record>,
    loaded: bool,
    filter: Option<Filter>,
    loads: usize,
}

/// Flat client-side store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RefCell<MemoryInner>,
    loader: Option<RecordLoader>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("inner", &self.inner)
            .field("remote", &self.loader.is_some())
            .finish()
    }
}

impl MemoryStore {
    /// A store that already holds its records.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            inner: RefCell::new(MemoryInner {
                records,
                loaded: true,
                ..MemoryInner::default()
            }),
            loader: None,
        }
    }

    /// An unloaded store filled by `loader` on the first load.
    pub fn with_loader(loader: RecordLoader) -> Self {
        Self {
            inner: RefCell::default(),
            loader: Some(loader),
        }
    }

    /// Number of completed loads and reloads.
    pub fn load_count(&self) -> usize {
        self.inner.borrow().loads
    }

    pub fn len(&self) -> usize {
        self.visible().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn filter(&self) -> Option<Filter> {
        self.inner.borrow().filter.clone()
    }

    /// Records passing the active filter, in store order.
    pub fn visible(&self) -> Vec<Record> {
        let inner = self.inner.borrow();
        inner
            .records
            .iter()
            .filter(|record| inner.filter.as_ref().is_none_or(|filter| filter.accepts(record)))
            .cloned()
            .collect()
    }

    async fn fetch(&self) -> Result<()> {
        let records = match &self.loader {
            Some(loader) => Some(loader().await?),
            None => None,
        };
        let mut inner = self.inner.borrow_mut();
        if let Some(records) = records {
            inner.records = records;
        }
        inner.loaded = true;
        inner.loads += 1;
        debug!(records = inner.records.len(), loads = inner.loads, "memory store loaded");
        Ok(())
    }
}

impl Store for MemoryStore {
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
        self.visible()
            .into_iter()
            .find(|record| matches_partial(record, partial))
    }

    fn find_index(&self, partial: &Record) -> Option<RecordIndex> {
        self.visible()
            .iter()
            .position(|record| matches_partial(record, partial))
            .map(RecordIndex::Flat)
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
}
