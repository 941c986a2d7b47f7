//! Pending changes staged on a [`crate::DbContext`] until the next commit.
//!
//! The set keeps at most one entry per `(collection, id)`; restaging an entity folds the
//! new change into the existing entry so the commit issues one statement per record.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One staged mutation. `body` is the serialized entity for `Added`/`Modified`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub collection: &'static str,
    pub id: Uuid,
    pub kind: ChangeKind,
    pub body: Option<String>,
}

impl PendingChange {
    pub fn added(collection: &'static str, id: Uuid, body: String) -> Self {
        Self {
            collection,
            id,
            kind: ChangeKind::Added,
            body: Some(body),
        }
    }

    pub fn modified(collection: &'static str, id: Uuid, body: String) -> Self {
        Self {
            collection,
            id,
            kind: ChangeKind::Modified,
            body: Some(body),
        }
    }

    pub fn deleted(collection: &'static str, id: Uuid) -> Self {
        Self {
            collection,
            id,
            kind: ChangeKind::Deleted,
            body: None,
        }
    }
}

/// Ordered set of pending changes, in staging order.
#[derive(Debug, Default)]
pub struct ChangeSet {
    entries: Vec<PendingChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `change`, merging it with an earlier entry for the same record.
    ///
    /// | earlier  | later    | result             |
    /// |----------|----------|--------------------|
    /// | Added    | Modified | Added, new body    |
    /// | Added    | Deleted  | entry dropped      |
    /// | Modified | Deleted  | Deleted            |
    /// | Deleted  | Added    | Modified, new body |
    /// | Deleted  | Modified | Deleted            |
    /// | other    | any      | later replaces     |
    pub fn stage(&mut self, change: PendingChange) {
        let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.collection == change.collection && e.id == change.id)
        else {
            self.entries.push(change);
            return;
        };

        let existing = &mut self.entries[pos];
        match (existing.kind, change.kind) {
            (ChangeKind::Added, ChangeKind::Modified) => existing.body = change.body,
            (ChangeKind::Added, ChangeKind::Deleted) => {
                self.entries.remove(pos);
            }
            (ChangeKind::Deleted, ChangeKind::Added) => {
                existing.kind = ChangeKind::Modified;
                existing.body = change.body;
            }
            (ChangeKind::Deleted, ChangeKind::Modified) => {}
            _ => *existing = change,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drains every entry, leaving the set empty.
    pub fn take(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLL: &str = "things";

    #[test]
    fn test_distinct_records_keep_staging_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut set = ChangeSet::new();
        set.stage(PendingChange::added(COLL, a, "{}".to_string()));
        set.stage(PendingChange::deleted(COLL, b));
        set.stage(PendingChange::added("others", a, "{}".to_string()));

        let ids: Vec<_> = set.iter().map(|c| (c.collection, c.id)).collect();
        assert_eq!(ids, vec![(COLL, a), (COLL, b), ("others", a)]);
    }

    #[test]
    fn test_added_then_modified_stays_added_with_new_body() {
        let id = Uuid::new_v4();
        let mut set = ChangeSet::new();
        set.stage(PendingChange::added(COLL, id, "v1".to_string()));
        set.stage(PendingChange::modified(COLL, id, "v2".to_string()));

        let changes = set.take();
        assert_eq!(changes, vec![PendingChange::added(COLL, id, "v2".to_string())]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_added_then_deleted_cancels_out() {
        let id = Uuid::new_v4();
        let mut set = ChangeSet::new();
        set.stage(PendingChange::added(COLL, id, "v1".to_string()));
        set.stage(PendingChange::deleted(COLL, id));

        assert!(set.is_empty());
    }

    #[test]
    fn test_deleted_then_added_becomes_modified() {
        let id = Uuid::new_v4();
        let mut set = ChangeSet::new();
        set.stage(PendingChange::deleted(COLL, id));
        set.stage(PendingChange::added(COLL, id, "v2".to_string()));

        assert_eq!(set.take(), vec![PendingChange::modified(COLL, id, "v2".to_string())]);
    }

    #[test]
    fn test_deleted_ignores_later_modification() {
        let id = Uuid::new_v4();
        let mut set = ChangeSet::new();
        set.stage(PendingChange::deleted(COLL, id));
        set.stage(PendingChange::modified(COLL, id, "v2".to_string()));

        assert_eq!(set.take(), vec![PendingChange::deleted(COLL, id)]);
    }

    #[test]
    fn test_modified_then_deleted_becomes_deleted() {
        let id = Uuid::new_v4();
        let mut set = ChangeSet::new();
        set.stage(PendingChange::modified(COLL, id, "v1".to_string()));
        set.stage(PendingChange::deleted(COLL, id));

        assert_eq!(set.len(), 1);
        assert_eq!(set.take(), vec![PendingChange::deleted(COLL, id)]);
    }
}
