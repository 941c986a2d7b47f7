//! Storage crate: a generic entity repository over a change-tracking SQLite context.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`config`] – StorageConfig (env-driven)
//! - [`sqlite_pool`] – SqlitePoolManager
//! - [`changes`] – Pending change set staged on a context
//! - [`context`] – DbContext and EntitySet
//! - [`query`] – Lazy, untracked Query
//! - [`repository`] – Repository trait and WriteOutcome
//! - [`entity_repository`] – EntityRepository (SQLite)
//! - [`blocking`] – BlockingRepository
//! - [`cancel`] – Cancellation helper

mod blocking;
mod cancel;
mod changes;
mod config;
mod context;
mod entity_repository;
mod error;
mod query;
mod repository;
mod sqlite_pool;


pub use blocking::BlockingRepository;
pub use cancel::cancellable;
pub use changes::{ChangeKind, ChangeSet, PendingChange};
pub use config::StorageConfig;
pub use context::{DbContext, EntitySet};
pub use entity_repository::EntityRepository;
pub use error::StorageError;
pub use query::{Query, SortOrder};
pub use repository::{Repository, WriteOutcome};
pub use sqlite_pool::SqlitePoolManager;

pub use tokio_util::sync::CancellationToken;
pub use whatevers_core::Entity;
