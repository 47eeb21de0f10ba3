use crate::{RelationCollection, RowLabeled, Value};
use std::sync::{Arc, Mutex};

/// Shared handle to an entity instance.
pub type RecordRef = Arc<dyn Record>;

/// Handle entities use to expose their relation collections to each other.
pub type SharedCollection = Arc<Mutex<RelationCollection>>;

/// Context handed to [`Record::serialize`] so an item can omit the back
/// reference to the entity it is being serialized under and avoid recursing
/// forever through a bidirectional relation.
pub struct SerializeContext<'a> {
    /// The entity owning the collection being serialized.
    pub parent: &'a dyn Record,
    /// The collection the item belongs to.
    pub collection: &'a RelationCollection,
}

/// The contract a relation collection needs from entity instances.
///
/// Entities are built and registered elsewhere; the collection only reads
/// their identity, their load state and, for bidirectional sync, the mirrored
/// collection on the other side.
pub trait Record: Send + Sync {
    /// Entity type name as known to the metadata registry.
    fn entity_type(&self) -> &str;

    /// Primary key, `Value::Null` while not assigned.
    fn primary_key(&self) -> Value;

    /// Whether the record's own fields are loaded. With `recursive`, every
    /// loaded relation on the record must be recursively initialized too.
    fn is_initialized(&self, recursive: bool) -> bool;

    /// Value of a single field, `Value::Null` when absent.
    fn field(&self, name: &str) -> Value;

    /// The record's relation collection for the given property, when it has
    /// one. Returning the handle must not trigger a load.
    fn collection(&self, relation: &str) -> Option<SharedCollection>;

    /// Externally serializable representation of the record.
    fn serialize(&self, context: &SerializeContext<'_>) -> RowLabeled;
}
