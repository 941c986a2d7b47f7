//! Capability trait for records that live in a keyed collection.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A uniquely identified record mapped to one storage collection.
///
/// The id must not change once assigned; storage treats `(COLLECTION, id)` as the key.
/// Implementors are persisted as their serde representation, so every field that should
/// survive a round trip has to be serializable.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the backing collection. One collection per entity type.
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
}
