//! Repository contract shared by every entity type.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StorageError;
use crate::query::Query;
use whatevers_core::Entity;

/// What a guarded write actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The change was committed.
    Applied,
    /// Insert skipped: a record with that id is already stored.
    SkippedAlreadyExists,
    /// Update skipped: no record with that id is stored.
    SkippedNotFound,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        self == WriteOutcome::Applied
    }
}

/// CRUD over the collection backing `T`.
///
/// Reads are untracked. Each mutating call commits on its own. A call that returns
/// [`StorageError::Cancelled`] left storage untouched; once the commit has been issued the
/// call no longer yields to `cancel` and returns what the commit did.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool, StorageError>;

    async fn insert(&self, entity: &T, cancel: &CancellationToken)
        -> Result<WriteOutcome, StorageError>;

    async fn select_by_id(
        &self,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, StorageError>;

    /// Lazy query over every record; nothing runs until it is executed.
    fn select_all(&self) -> Query<T>;

    async fn update(&self, entity: &T, cancel: &CancellationToken)
        -> Result<WriteOutcome, StorageError>;

    /// Fails with [`StorageError::NotFound`] when no record has `id`.
    async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> Result<(), StorageError>;
}
