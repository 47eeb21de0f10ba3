use crate::{RecordRef, Result, Value};

/// Join table configuration for a many-to-many relation, present on the
/// owning side only.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinTable {
    /// Name of the intermediate table.
    pub table: String,
    /// Column holding the owning entity's primary key.
    pub owner_column: String,
    /// Column holding the collected entity's primary key.
    pub target_column: String,
}

/// Storage shape of a relation. Other kinds of reference (to-one) never go
/// through a collection and are out of scope here.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationKind {
    /// Target rows carry a foreign key column pointing back at the owner.
    OneToMany { foreign_key: String },
    /// Membership lives either in `join` (engines with a join table) or in
    /// the `foreign_key` key list column on the owning rows. Both are `None`
    /// on the inverse side, which borrows the owning side's configuration
    /// through the registry.
    ManyToMany {
        foreign_key: Option<String>,
        join: Option<JoinTable>,
    },
}

/// Read-only metadata describing one relation property of an entity type.
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    pub kind: RelationKind,
    /// Whether this side holds the authoritative foreign key or join table
    /// rows. Only owning side mutations mark a collection dirty.
    pub owning_side: bool,
    /// Name of the mirrored property on the target entity, when the relation
    /// is bidirectional.
    pub inverse_relation: Option<String>,
    /// Entity type being collected.
    pub target_entity: String,
}

impl RelationDescriptor {
    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ManyToMany { .. })
    }
}

/// The entity factory and metadata lookup the loader consumes.
///
/// A single read-only interface: the collection never reaches into a global
/// registry, it is handed one of these per load.
pub trait EntityRegistry {
    /// Metadata for the named relation property of an entity type.
    fn relation(&self, entity: &str, relation: &str) -> Option<&RelationDescriptor>;

    /// Name of the primary key column of an entity type.
    fn primary_key_column(&self, entity: &str) -> &str;

    /// Build a reference-only entity: primary key populated, remaining
    /// fields pending a later fetch.
    fn reference(&self, entity: &str, key: Value) -> Result<RecordRef>;
}
