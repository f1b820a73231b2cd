//! In-memory implementations of the storage ports.
//!
//! These stand in for the relational store wherever a real database is
//! not wanted: engine and sync tests, API tests, local experiments.
//! They honor the same ordering and filter contracts as the PostgreSQL
//! adapters.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::models::AssociationKind;

use super::pagination::{OrderDirection, Ordering, OrderingKey, PageBounds, Searchable, SortValue};
use super::repository::{AssociationStore, PageFetcher, SearchFilter};

type Matcher<T> = Box<dyn Fn(&T, &SearchFilter) -> bool + Send + Sync>;

// =============================================================================
// Page Fetcher
// =============================================================================

/// In-memory [`PageFetcher`] over a vector of rows.
///
/// By default a row matches a search term when any of its text sort
/// fields contains the term, case-insensitively. Other filter fields are
/// ignored unless a custom matcher is installed with
/// [`MemoryPageFetcher::with_matcher`].
pub struct MemoryPageFetcher<T> {
    rows: Mutex<Vec<T>>,
    matcher: Matcher<T>,
    fetch_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl<T: Searchable + Clone> MemoryPageFetcher<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows: Mutex::new(rows),
            matcher: Box::new(default_matcher::<T>),
            fetch_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the row filter.
    pub fn with_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&T, &SearchFilter) -> bool + Send + Sync + 'static,
    {
        self.matcher = Box::new(matcher);
        self
    }

    /// Delete a row by id, simulating a concurrent write.
    pub fn remove(&self, id: i64) {
        self.lock().retain(|r| r.id() != id);
    }

    /// Number of data queries served.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of count queries served.
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(AtomicOrdering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn matching(&self, filter: &SearchFilter) -> Vec<T> {
        self.lock()
            .iter()
            .filter(|row| (self.matcher)(row, filter))
            .cloned()
            .collect()
    }
}

fn default_matcher<T: Searchable>(row: &T, filter: &SearchFilter) -> bool {
    let Some(term) = filter.normalized_term() else {
        return true;
    };
    let term = term.to_lowercase();
    T::SORT
        .allowed
        .iter()
        .any(|field| match row.sort_value(field) {
            SortValue::Text(text) => text.to_lowercase().contains(&term),
            _ => false,
        })
}

/// Compare two rows' `(sort value, id)` pairs in `direction`.
fn compare_positions(a: (&SortValue, i64), b: (&SortValue, i64), direction: OrderDirection) -> CmpOrdering {
    let natural = a.0.cmp(b.0).then(a.1.cmp(&b.1));
    match direction {
        OrderDirection::Asc => natural,
        OrderDirection::Desc => natural.reverse(),
    }
}

#[async_trait]
impl<T: Searchable + Clone> PageFetcher<T> for MemoryPageFetcher<T> {
    async fn fetch_page(
        &self,
        filter: &SearchFilter,
        ordering: &Ordering,
        bounds: &PageBounds,
    ) -> StorageResult<Vec<T>> {
        self.fetch_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut rows: Vec<(SortValue, T)> = self
            .matching(filter)
            .into_iter()
            .map(|row| (row.sort_value(ordering.field), row))
            .collect();
        rows.sort_by(|(va, a), (vb, b)| {
            compare_positions((va, a.id()), (vb, b.id()), ordering.direction)
        });

        let page = match bounds {
            PageBounds::After { position, limit } => {
                let after = |value: &SortValue, id: i64, key: &OrderingKey| {
                    compare_positions((value, id), (&key.value, key.id), ordering.direction)
                        == CmpOrdering::Greater
                };
                rows.into_iter()
                    .filter(|(value, row)| match position {
                        Some(key) => after(value, row.id(), key),
                        None => true,
                    })
                    .take(*limit as usize)
                    .map(|(_, row)| row)
                    .collect()
            }
            PageBounds::Offset { offset, limit } => rows
                .into_iter()
                .skip(*offset as usize)
                .take(*limit as usize)
                .map(|(_, row)| row)
                .collect(),
        };

        Ok(page)
    }

    async fn count(&self, filter: &SearchFilter) -> StorageResult<i64> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(self.matching(filter).len() as i64)
    }
}

// =============================================================================
// Association Store
// =============================================================================

/// Operation recorded by [`MemoryAssociationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOp {
    Add(i64),
    Remove(i64),
}

/// In-memory [`AssociationStore`] with injectable failures.
///
/// Adding an id outside the known set returns `Ok(false)`; ids marked with
/// [`MemoryAssociationStore::fail_add`] / [`MemoryAssociationStore::fail_remove`]
/// return a storage error.
pub struct MemoryAssociationStore {
    kind: AssociationKind,
    links: Mutex<HashMap<i64, Vec<i64>>>,
    known: Option<HashSet<i64>>,
    labels: HashMap<i64, String>,
    failing_adds: HashSet<i64>,
    failing_removes: HashSet<i64>,
    ops: Mutex<Vec<AssociationOp>>,
}

impl MemoryAssociationStore {
    pub fn new(kind: AssociationKind) -> Self {
        Self {
            kind,
            links: Mutex::new(HashMap::new()),
            known: None,
            labels: HashMap::new(),
            failing_adds: HashSet::new(),
            failing_removes: HashSet::new(),
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Seed the links of `parent_id`.
    pub fn with_links(self, parent_id: i64, ids: &[i64]) -> Self {
        self.links_lock().insert(parent_id, ids.to_vec());
        self
    }

    /// Restrict valid related ids to `ids`.
    pub fn with_known(mut self, ids: &[i64]) -> Self {
        self.known = Some(ids.iter().copied().collect());
        self
    }

    pub fn with_label(mut self, id: i64, label: &str) -> Self {
        self.labels.insert(id, label.to_string());
        self
    }

    /// Make adding `id` fail with a storage error.
    pub fn fail_add(mut self, id: i64) -> Self {
        self.failing_adds.insert(id);
        self
    }

    /// Make removing `id` fail with a storage error.
    pub fn fail_remove(mut self, id: i64) -> Self {
        self.failing_removes.insert(id);
        self
    }

    /// Current links of `parent_id`, in insertion order.
    pub fn links(&self, parent_id: i64) -> Vec<i64> {
        self.links_lock().get(&parent_id).cloned().unwrap_or_default()
    }

    /// Every add/remove attempted so far, in call order.
    pub fn ops(&self) -> Vec<AssociationOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, op: AssociationOp) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
    }

    fn links_lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Vec<i64>>> {
        self.links.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AssociationStore for MemoryAssociationStore {
    fn kind(&self) -> AssociationKind {
        self.kind
    }

    async fn add_to(&self, parent_id: i64, id: i64) -> StorageResult<bool> {
        self.record(AssociationOp::Add(id));
        if self.failing_adds.contains(&id) {
            return Err(StorageError::QueryError(format!("insert of {id} rejected")));
        }
        if self.known.as_ref().is_some_and(|known| !known.contains(&id)) {
            return Ok(false);
        }
        let mut links = self.links_lock();
        let ids = links.entry(parent_id).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
        Ok(true)
    }

    async fn remove_from(&self, parent_id: i64, id: i64) -> StorageResult<bool> {
        self.record(AssociationOp::Remove(id));
        if self.failing_removes.contains(&id) {
            return Err(StorageError::QueryError(format!("delete of {id} rejected")));
        }
        let mut links = self.links_lock();
        let Some(ids) = links.get_mut(&parent_id) else {
            return Ok(false);
        };
        let before = ids.len();
        ids.retain(|existing| *existing != id);
        Ok(ids.len() < before)
    }

    async fn labels(&self, ids: &[i64]) -> StorageResult<Vec<(i64, String)>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.labels.get(id).map(|label| (*id, label.clone())))
            .collect())
    }
}
