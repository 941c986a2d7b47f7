//! Persistence context: the pool plus the set of changes staged against it.
//!
//! A [`DbContext`] is one logical unit of work. Repositories share it through an `Arc`, so
//! everything staged through any of them is committed together by the next
//! [`DbContext::save_changes`]. Reads never register anything with the context.

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};

use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cancel::cancellable;
use crate::changes::{ChangeKind, ChangeSet, PendingChange};
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::query::Query;
use crate::sqlite_pool::SqlitePoolManager;
use whatevers_core::Entity;

/// Shared session over one SQLite database.
///
/// Staging is synchronous and guarded by a mutex that is never held across an await, so the
/// context is `Send + Sync`. It still models a single unit of work: concurrent callers that
/// stage and commit through the same context will commit each other's changes.
pub struct DbContext {
    pool_manager: SqlitePoolManager,
    pending: Mutex<ChangeSet>,
}

impl DbContext {
    /// Connects and makes sure the `entities` table exists.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(config).await?;
        let context = Self {
            pool_manager,
            pending: Mutex::new(ChangeSet::new()),
        };
        context.init().await?;
        Ok(context)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating entities table if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        self.pool_manager.pool()
    }

    /// Accessor for the collection backing `T`.
    pub fn set<T: Entity>(&self) -> EntitySet<'_, T> {
        EntitySet {
            context: self,
            _entity: PhantomData,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.pending().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Drops everything staged since the last commit.
    pub fn discard_changes(&self) {
        let mut pending = self.pending();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Discarding pending changes");
            pending.clear();
        }
    }

    /// Commits all staged changes in one transaction, in staging order.
    ///
    /// Returns the number of rows written. A staged update or removal that matches no row
    /// fails with [`StorageError::Conflict`]. See [`DbContext::save_changes_cancellable`] for
    /// what happens to the pending set on failure.
    pub async fn save_changes(&self) -> Result<usize, StorageError> {
        self.save_changes_cancellable(&CancellationToken::new()).await
    }

    /// Like [`DbContext::save_changes`], but gives up when `cancel` fires before the commit
    /// is issued.
    ///
    /// The pending set is drained before the first await, including changes other callers
    /// staged on this context. If any statement fails or the token fires first, the
    /// transaction rolls back and every drained change is discarded. Once `COMMIT` is sent
    /// it runs to completion and its result is reported as is, even if the token fires
    /// while it waits on a lock.
    pub async fn save_changes_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<usize, StorageError> {
        let changes = self.pending().take();
        if changes.is_empty() {
            return Ok(0);
        }

        let count = changes.len();
        match self.apply(&changes, cancel).await {
            Ok(written) => {
                info!(written = written, "Committed pending changes");
                Ok(written)
            }
            Err(e) => {
                warn!(discarded = count, error = %e, "Commit failed; discarded pending changes");
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        changes: &[PendingChange],
        cancel: &CancellationToken,
    ) -> Result<usize, StorageError> {
        let mut tx = cancellable(cancel, async {
            self.pool().begin().await.map_err(StorageError::from)
        })
        .await?;
        let written = cancellable(cancel, write_changes(&mut tx, changes)).await?;

        // dropping the transaction rolls it back
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Closes the pool. Pending changes are discarded.
    pub async fn close(&self) {
        self.discard_changes();
        self.pool().close().await;
    }

    fn stage(&self, change: PendingChange) {
        debug!(
            collection = change.collection,
            id = %change.id,
            kind = ?change.kind,
            "Staging change"
        );
        self.pending().stage(change);
    }

    fn pending(&self) -> MutexGuard<'_, ChangeSet> {
        // a panic while staging cannot leave the set half-updated
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn write_changes(
    tx: &mut Transaction<'static, Sqlite>,
    changes: &[PendingChange],
) -> Result<usize, StorageError> {
    let mut written = 0usize;

    for change in changes {
        let id = change.id.to_string();
        let result = match change.kind {
            ChangeKind::Added => {
                sqlx::query("INSERT INTO entities (collection, id, body) VALUES (?1, ?2, ?3)")
                    .bind(change.collection)
                    .bind(&id)
                    .bind(change.body.as_deref().unwrap_or("null"))
                    .execute(&mut **tx)
                    .await?
            }
            ChangeKind::Modified => {
                sqlx::query("UPDATE entities SET body = ?1 WHERE collection = ?2 AND id = ?3")
                    .bind(change.body.as_deref().unwrap_or("null"))
                    .bind(change.collection)
                    .bind(&id)
                    .execute(&mut **tx)
                    .await?
            }
            ChangeKind::Deleted => {
                sqlx::query("DELETE FROM entities WHERE collection = ?1 AND id = ?2")
                    .bind(change.collection)
                    .bind(&id)
                    .execute(&mut **tx)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict {
                collection: change.collection,
                id: change.id,
            });
        }
        written += result.rows_affected() as usize;
    }

    Ok(written)
}

/// Typed view of one collection on a [`DbContext`].
pub struct EntitySet<'a, T> {
    context: &'a DbContext,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> EntitySet<'a, T> {
    /// Stages `entity` for insertion. The entity is serialized now, not at commit.
    pub fn add(&self, entity: &T) -> Result<(), StorageError> {
        let body = serde_json::to_string(entity)?;
        self.context
            .stage(PendingChange::added(T::COLLECTION, entity.id(), body));
        Ok(())
    }

    /// Marks `entity` as fully modified; the commit replaces the stored record.
    pub fn update(&self, entity: &T) -> Result<(), StorageError> {
        let body = serde_json::to_string(entity)?;
        self.context
            .stage(PendingChange::modified(T::COLLECTION, entity.id(), body));
        Ok(())
    }

    /// Stages removal of `entity`.
    pub fn remove(&self, entity: &T) {
        self.context
            .stage(PendingChange::deleted(T::COLLECTION, entity.id()));
    }

    /// Untracked query over the whole collection. Nothing runs until it is executed.
    pub fn query(&self) -> Query<T> {
        Query::new(self.context.pool().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Gadget {
        id: Uuid,
        label: String,
    }

    impl Entity for Gadget {
        const COLLECTION: &'static str = "gadgets";

        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn gadget(label: &str) -> Gadget {
        Gadget {
            id: Uuid::new_v4(),
            label: label.to_string(),
        }
    }

    async fn create_test_context() -> DbContext {
        DbContext::connect(&StorageConfig::in_memory())
            .await
            .expect("Failed to create context")
    }

    #[tokio::test]
    async fn test_staged_changes_are_invisible_until_saved() {
        let ctx = create_test_context().await;
        let g = gadget("lever");

        ctx.set::<Gadget>().add(&g).unwrap();
        assert!(ctx.has_changes());
        assert!(!ctx.set::<Gadget>().query().with_id(g.id).any().await.unwrap());

        assert_eq!(ctx.save_changes().await.unwrap(), 1);
        assert!(!ctx.has_changes());
        assert!(ctx.set::<Gadget>().query().with_id(g.id).any().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_without_changes_is_zero() {
        let ctx = create_test_context().await;
        assert_eq!(ctx.save_changes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_several_changes_commit_together() {
        let ctx = create_test_context().await;
        let (a, b) = (gadget("a"), gadget("b"));

        ctx.set::<Gadget>().add(&a).unwrap();
        ctx.set::<Gadget>().add(&b).unwrap();
        assert_eq!(ctx.save_changes().await.unwrap(), 2);

        let mut b2 = b.clone();
        b2.label = "b2".to_string();
        ctx.set::<Gadget>().update(&b2).unwrap();
        ctx.set::<Gadget>().remove(&a);
        assert_eq!(ctx.pending_count(), 2);
        assert_eq!(ctx.save_changes().await.unwrap(), 2);

        let all = ctx.set::<Gadget>().query().fetch_all().await.unwrap();
        assert_eq!(all, vec![b2]);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_everything() {
        let ctx = create_test_context().await;
        let existing = gadget("existing");
        ctx.set::<Gadget>().add(&existing).unwrap();
        ctx.save_changes().await.unwrap();

        let fresh = gadget("fresh");
        ctx.set::<Gadget>().add(&fresh).unwrap();
        ctx.set::<Gadget>().add(&existing).unwrap();

        let err = ctx.save_changes().await.unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
        assert!(!ctx.has_changes());
        assert!(!ctx.set::<Gadget>().query().with_id(fresh.id).any().await.unwrap());
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_conflict() {
        let ctx = create_test_context().await;
        let ghost = gadget("ghost");

        ctx.set::<Gadget>().update(&ghost).unwrap();
        let err = ctx.save_changes().await.unwrap_err();

        assert!(matches!(err, StorageError::Conflict { id, .. } if id == ghost.id));
    }

    #[tokio::test]
    async fn test_cancelled_save_writes_nothing() {
        let ctx = create_test_context().await;
        let g = gadget("late");
        ctx.set::<Gadget>().add(&g).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ctx.save_changes_cancellable(&cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(!ctx.has_changes());
        assert!(!ctx.set::<Gadget>().query().with_id(g.id).any().await.unwrap());
    }

    #[tokio::test]
    async fn test_discard_changes() {
        let ctx = create_test_context().await;
        ctx.set::<Gadget>().add(&gadget("x")).unwrap();
        ctx.discard_changes();

        assert!(!ctx.has_changes());
        assert_eq!(ctx.save_changes().await.unwrap(), 0);
    }
}
