//! Blocking facade over [`EntityRepository`] for callers outside an async runtime.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::entity_repository::EntityRepository;
use crate::error::StorageError;
use crate::query::Query;
use crate::repository::{Repository, WriteOutcome};
use whatevers_core::Entity;

/// Drives an [`EntityRepository`] to completion on a dedicated runtime.
///
/// The context behind `inner` must have been connected on `runtime`. Calling any method
/// from inside an async task panics, as `Runtime::block_on` does.
pub struct BlockingRepository<T> {
    inner: EntityRepository<T>,
    runtime: Arc<Runtime>,
}

impl<T: Entity> BlockingRepository<T> {
    pub fn new(inner: EntityRepository<T>, runtime: Arc<Runtime>) -> Self {
        Self { inner, runtime }
    }

    pub fn exists(&self, id: Uuid) -> Result<bool, StorageError> {
        self.runtime
            .block_on(self.inner.exists(id, &CancellationToken::new()))
    }

    pub fn insert(&self, entity: &T) -> Result<WriteOutcome, StorageError> {
        self.runtime
            .block_on(self.inner.insert(entity, &CancellationToken::new()))
    }

    pub fn select_by_id(&self, id: Uuid) -> Result<Option<T>, StorageError> {
        self.runtime
            .block_on(self.inner.select_by_id(id, &CancellationToken::new()))
    }

    pub fn select_all(&self) -> Query<T> {
        self.inner.select_all()
    }

    /// Executes a query built from [`Self::select_all`].
    pub fn fetch_all(&self, query: &Query<T>) -> Result<Vec<T>, StorageError> {
        self.runtime.block_on(query.fetch_all())
    }

    pub fn update(&self, entity: &T) -> Result<WriteOutcome, StorageError> {
        self.runtime
            .block_on(self.inner.update(entity, &CancellationToken::new()))
    }

    pub fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        self.runtime
            .block_on(self.inner.delete(id, &CancellationToken::new()))
    }
}
