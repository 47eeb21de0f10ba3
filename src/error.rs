use crate::Value;
use std::fmt::{self, Display};

/// Access to a relation collection that has not been loaded or hydrated yet.
///
/// This is a programming error on the caller side, not a transient condition:
/// it is raised immediately and never retried. The target entity type and the
/// owner's primary key identify which relation on which entity was touched
/// too early.
#[derive(Debug, Clone, PartialEq)]
pub struct UninitializedAccess {
    /// Entity type collected by the relation.
    pub target: String,
    /// Primary key of the entity owning the collection.
    pub owner_key: Value,
}

impl Display for UninitializedAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The collection of {} entities on the owner with primary key {} was accessed before being initialized",
            self.target, self.owner_key
        )
    }
}

impl std::error::Error for UninitializedAccess {}
