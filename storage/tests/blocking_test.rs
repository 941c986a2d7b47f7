//! Tests for [`whatevers_storage::BlockingRepository`] driven from plain threads.

use std::sync::Arc;

use whatevers_core::{Entity, Whatever};
use whatevers_storage::{
    BlockingRepository, DbContext, EntityRepository, StorageConfig, WriteOutcome,
};

fn create_blocking_repo() -> BlockingRepository<Whatever> {
    let runtime = Arc::new(
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build runtime"),
    );
    let context = runtime
        .block_on(DbContext::connect(&StorageConfig::in_memory()))
        .expect("Failed to create context");
    BlockingRepository::new(EntityRepository::new(Arc::new(context)), runtime)
}

#[test]
fn test_blocking_crud() {
    let repo = create_blocking_repo();
    let w = Whatever::new("sync", None).unwrap();

    assert_eq!(repo.insert(&w).unwrap(), WriteOutcome::Applied);
    assert_eq!(repo.insert(&w).unwrap(), WriteOutcome::SkippedAlreadyExists);
    assert!(repo.exists(w.id()).unwrap());

    let renamed = Whatever::with_id(w.id(), "still sync", None).unwrap();
    assert_eq!(repo.update(&renamed).unwrap(), WriteOutcome::Applied);
    assert_eq!(repo.select_by_id(w.id()).unwrap(), Some(renamed.clone()));

    let all = repo.fetch_all(&repo.select_all()).unwrap();
    assert_eq!(all, vec![renamed]);

    repo.delete(w.id()).unwrap();
    assert!(!repo.exists(w.id()).unwrap());
    assert!(repo.delete(w.id()).unwrap_err().is_not_found());
}
