//! Ordered, searchable, paginated currency catalog.
//!
//! `Catalog` owns the record list through its `CatalogStore` and lets only the
//! `OrderingEngine` reorder it. The guards here keep the two from stepping on
//! each other: no reordering under a filter or during a save, no reload or
//! delete during a save.

pub mod ordering;
pub mod repository;
pub mod store;

use ordering::{Direction, OrderingEngine, PersistError, PersistJob, PersistReport, ReorderError};
use repository::{CatalogRepository, RepositoryError};
use store::{CatalogStore, LoadOutcome};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("the order is being saved")]
    Busy,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct Catalog {
    store: CatalogStore,
    ordering: OrderingEngine,
}

impl Catalog {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            store,
            ordering: OrderingEngine::new(),
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Search and pagination controls. Reordering goes through `Catalog`.
    pub fn store_mut(&mut self) -> &mut CatalogStore {
        &mut self.store
    }

    pub fn ordering(&self) -> &OrderingEngine {
        &self.ordering
    }

    pub fn is_dirty(&self) -> bool {
        self.ordering.is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.ordering.is_saving()
    }

    /// Whether reorder controls should be offered right now.
    pub fn can_reorder(&self) -> bool {
        !self.store.is_filtered() && !self.ordering.is_saving()
    }

    /// Reload from the repository, discarding any unsaved order.
    pub async fn load<R: CatalogRepository>(&mut self, repo: &R) -> Result<LoadOutcome, CatalogError> {
        if self.ordering.is_saving() {
            return Err(CatalogError::Busy);
        }
        let outcome = self.store.load(repo).await;
        if outcome.is_loaded() {
            self.ordering.reset();
        }
        Ok(outcome)
    }

    /// Delete a record, then reload. On failure the list is left untouched.
    pub async fn delete<R: CatalogRepository>(&mut self, repo: &R, id: i64) -> Result<LoadOutcome, CatalogError> {
        if self.ordering.is_saving() {
            return Err(CatalogError::Busy);
        }
        repo.delete(id).await?;
        tracing::info!(id, "currency deleted");
        self.load(repo).await
    }

    pub fn move_step(&mut self, index: usize, direction: Direction) -> Result<bool, ReorderError> {
        self.ensure_unfiltered()?;
        self.ordering.move_step(self.store.records_mut(), index, direction)
    }

    pub fn drag_reorder(&mut self, from: usize, to: usize) -> Result<bool, ReorderError> {
        self.ensure_unfiltered()?;
        self.ordering.drag_reorder(self.store.records_mut(), from, to)
    }

    pub fn begin_drag(&mut self, index: usize) -> Result<bool, ReorderError> {
        self.ensure_unfiltered()?;
        self.ordering.begin_drag(self.store.records(), index)
    }

    pub fn drag_over(&mut self, target: usize) -> Result<bool, ReorderError> {
        self.ensure_unfiltered()?;
        self.ordering.drag_over(self.store.records_mut(), target)
    }

    pub fn end_drag(&mut self) {
        self.ordering.end_drag();
    }

    pub fn begin_persist(&mut self) -> Result<Option<PersistJob>, PersistError> {
        self.ordering.begin_persist(self.store.records())
    }

    pub fn finish_persist(&mut self, report: &PersistReport) {
        self.ordering.finish_persist(self.store.records_mut(), report);
    }

    pub async fn persist<R: CatalogRepository>(&mut self, repo: &R) -> Result<PersistReport, PersistError> {
        self.ordering.persist(self.store.records_mut(), repo).await
    }

    fn ensure_unfiltered(&self) -> Result<(), ReorderError> {
        if self.store.is_filtered() {
            Err(ReorderError::Filtered)
        } else {
            Ok(())
        }
    }
}
