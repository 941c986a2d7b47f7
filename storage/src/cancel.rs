//! Cancellation for storage round trips.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::StorageError;

/// Runs `fut` unless `cancel` fires first.
///
/// An already-cancelled token short-circuits before `fut` is polled. Otherwise the token is
/// checked ahead of the future on every wakeup; when it wins, `fut` is dropped, which rolls
/// back any transaction it had open, and the caller gets [`StorageError::Cancelled`].
pub async fn cancellable<F, R>(cancel: &CancellationToken, fut: F) -> Result<R, StorageError>
where
    F: Future<Output = Result<R, StorageError>>,
{
    if cancel.is_cancelled() {
        return Err(StorageError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Storage operation cancelled");
            Err(StorageError::Cancelled)
        }
        result = fut => result,
    }
}
