//! Entity repository: generic CRUD over a shared [`DbContext`].
//!
//! Every operation is a thin delegation: reads go through an untracked [`Query`], writes are
//! staged on the context's [`crate::EntitySet`] and committed immediately with
//! [`DbContext::save_changes_cancellable`]. Callers that need several writes in one
//! transaction stage them on the context directly.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cancel::cancellable;
use crate::context::DbContext;
use crate::error::StorageError;
use crate::query::Query;
use crate::repository::{Repository, WriteOutcome};
use whatevers_core::Entity;

/// CRUD over the collection backing `T`.
///
/// Repositories cloned from the same `Arc<DbContext>` share one change set. Each write
/// commits everything pending on that context, and a write that fails or is cancelled
/// discards all of it, including changes staged by other callers. Cancellation is honored
/// up to the point the commit is issued; after that the write finishes and reports its
/// real outcome.
pub struct EntityRepository<T> {
    context: Arc<DbContext>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityRepository<T> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> EntityRepository<T> {
    pub fn new(context: Arc<DbContext>) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }

    pub fn context(&self) -> &Arc<DbContext> {
        &self.context
    }

    fn query_by_id(&self, id: Uuid) -> Query<T> {
        self.context.set::<T>().query().with_id(id)
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for EntityRepository<T> {
    async fn exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool, StorageError> {
        cancellable(cancel, self.query_by_id(id).any()).await
    }

    async fn insert(
        &self,
        entity: &T,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome, StorageError> {
        let id = entity.id();
        if cancellable(cancel, self.query_by_id(id).any()).await? {
            debug!(collection = T::COLLECTION, %id, "Insert skipped: already exists");
            return Ok(WriteOutcome::SkippedAlreadyExists);
        }

        self.context.set::<T>().add(entity)?;
        self.context.save_changes_cancellable(cancel).await?;

        info!(collection = T::COLLECTION, %id, "Inserted entity");
        Ok(WriteOutcome::Applied)
    }

    async fn select_by_id(
        &self,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, StorageError> {
        cancellable(cancel, self.query_by_id(id).first()).await
    }

    fn select_all(&self) -> Query<T> {
        self.context.set::<T>().query()
    }

    async fn update(
        &self,
        entity: &T,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome, StorageError> {
        let id = entity.id();
        if !cancellable(cancel, self.query_by_id(id).any()).await? {
            debug!(collection = T::COLLECTION, %id, "Update skipped: not found");
            return Ok(WriteOutcome::SkippedNotFound);
        }

        self.context.set::<T>().update(entity)?;
        self.context.save_changes_cancellable(cancel).await?;

        info!(collection = T::COLLECTION, %id, "Updated entity");
        Ok(WriteOutcome::Applied)
    }

    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> Result<(), StorageError> {
        let entity = cancellable(cancel, self.query_by_id(id).first())
            .await?
            .ok_or(StorageError::NotFound {
                collection: T::COLLECTION,
                id,
            })?;

        self.context.set::<T>().remove(&entity);
        self.context.save_changes_cancellable(cancel).await?;

        info!(collection = T::COLLECTION, %id, "Deleted entity");
        Ok(())
    }
}
