use crate::{
    Condition, EntityRegistry, Error, JoinTable, Record, RecordRef, RelationDescriptor,
    RelationKind, Result, RowLabeled, SerializeContext, SharedCollection, StorageAdapter,
    UninitializedAccess, Value,
    stream::TryStreamExt,
};
use anyhow::Context;
use std::sync::{Arc, Mutex, Weak};

#[derive(Clone, Copy)]
enum InverseOp {
    Add,
    Remove,
}

/// An ordered, lazily loaded set of entities associated to one owning entity
/// through a single relation property.
///
/// The collection stays unloaded until [`RelationCollection::init`] runs the
/// loading protocol or [`RelationCollection::set`] hydrates it from an
/// earlier fetch. Every accessor and mutator fails fast with
/// [`UninitializedAccess`] until then. Mutations on the owning side of the
/// relation mark the collection dirty for later persistence and mirror
/// themselves onto the inverse collection of the affected entity, provided
/// that collection is already loaded.
pub struct RelationCollection {
    /// The entity this collection belongs to. Non owning: the collection's
    /// lifetime equals its owner's, never the other way around.
    owner: Weak<dyn Record>,
    descriptor: Arc<RelationDescriptor>,
    /// Unique by non null primary key, insertion order significant.
    items: Vec<RecordRef>,
    initialized: bool,
    dirty: bool,
    populated: bool,
}

impl RelationCollection {
    /// A collection that has not touched storage yet.
    pub fn new(owner: Weak<dyn Record>, descriptor: Arc<RelationDescriptor>) -> Self {
        Self {
            owner,
            descriptor,
            items: Vec::new(),
            initialized: false,
            dirty: false,
            populated: false,
        }
    }

    /// A collection seeded with items already known from a prior fetch.
    /// Hydration is not a local change: the collection starts clean.
    pub fn hydrated(
        owner: Weak<dyn Record>,
        descriptor: Arc<RelationDescriptor>,
        items: Vec<RecordRef>,
    ) -> Result<Self> {
        let mut collection = Self::new(owner, descriptor);
        collection.set(items, true)?;
        Ok(collection)
    }

    /// Wrap the collection in the shared handle entities hand out through
    /// [`Record::collection`].
    pub fn into_shared(self) -> SharedCollection {
        Arc::new(Mutex::new(self))
    }

    pub fn descriptor(&self) -> &RelationDescriptor {
        &self.descriptor
    }

    pub fn owner(&self) -> Result<RecordRef> {
        self.owner.upgrade().ok_or_else(|| {
            Error::msg(format!(
                "The owner of the {} collection was dropped",
                self.descriptor.target_entity
            ))
        })
    }

    /// Whether the collection reflects storage. With `fully`, every contained
    /// item must additionally be recursively initialized.
    pub fn is_initialized(&self, fully: bool) -> bool {
        if !self.initialized {
            return false;
        }
        !fully || self.items.iter().all(|v| v.is_initialized(true))
    }

    /// Whether the collection carries owning side changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn should_populate(&self) -> bool {
        self.populated
    }

    pub fn mark_populated(&mut self, flag: bool) {
        self.populated = flag;
    }

    /// Load the collection from storage.
    ///
    /// The protocol runs strictly in sequence: join table membership is
    /// resolved first on engines that use one, an empty owning side many to
    /// many short circuits without a query, otherwise matching entities are
    /// fetched with the relation's condition, reordered where the engine
    /// cannot guarantee `IN (...)` ordering and committed together with the
    /// state flags. On a fetch failure nothing is committed: the items known
    /// before the call stay in place and `initialized` keeps its previous
    /// value. Returns the collection itself to allow chaining.
    pub async fn init<Exec, Reg>(
        &mut self,
        executor: &mut Exec,
        registry: &Reg,
        populate: &[&str],
    ) -> Result<&mut Self>
    where
        Exec: StorageAdapter,
        Reg: EntityRegistry,
    {
        if !self.initialized && self.descriptor.is_many_to_many() && executor.uses_pivot_table() {
            self.load_from_pivot(executor, registry).await?;
        }
        if self.descriptor.is_many_to_many()
            && self.descriptor.owning_side
            && self.items.is_empty()
        {
            // An empty owning side many to many can never gain rows from a
            // lookup by known ids, the query is skipped entirely.
            self.initialized = true;
            self.dirty = false;
            self.populated = true;
            return Ok(self);
        }
        let condition = self.fetch_condition(executor.uses_pivot_table(), registry)?;
        let snapshot = self.keys();
        log::debug!(
            "Loading the {} collection of owner {}",
            self.descriptor.target_entity,
            self.owner().map(|v| v.primary_key()).unwrap_or_default(),
        );
        let mut fetched: Vec<RecordRef> = executor
            .find(&self.descriptor.target_entity, &condition, populate)
            .try_collect()
            .await
            .with_context(|| {
                format!(
                    "Failed to load the {} collection",
                    self.descriptor.target_entity
                )
            })?;
        if self.descriptor.is_many_to_many() && self.descriptor.owning_side {
            // The fetch used an id lookup and engines do not guarantee the
            // results follow the input order: restore the order captured
            // before the fetch. Keys absent from the snapshot sort first.
            fetched.sort_by_key(|item| {
                let key = item.primary_key();
                snapshot
                    .iter()
                    .position(|v| *v == key)
                    .map_or(-1, |v| v as i64)
            });
        }
        self.items.clear();
        self.items.extend(fetched);
        self.initialized = true;
        self.dirty = false;
        self.populated = true;
        Ok(self)
    }

    /// Snapshot of the current items, detached from the collection.
    pub fn items(&self) -> Result<Vec<RecordRef>> {
        self.ensure_initialized()?;
        Ok(self.items.clone())
    }

    /// Iterate the items in their current order. Fails fast on an
    /// uninitialized collection exactly like [`RelationCollection::items`].
    pub fn iter(&self) -> Result<impl Iterator<Item = &RecordRef>> {
        self.ensure_initialized()?;
        Ok(self.items.iter())
    }

    /// Serialize every item, passing the owner and this collection as context
    /// so items can drop their back references.
    pub fn to_rows(&self) -> Result<Vec<RowLabeled>> {
        self.ensure_initialized()?;
        let owner = self.owner()?;
        let context = SerializeContext {
            parent: owner.as_ref(),
            collection: self,
        };
        Ok(self.items.iter().map(|v| v.serialize(&context)).collect())
    }

    /// Project one field from every item, typically the primary key column.
    pub fn identifiers(&self, field: &str) -> Result<Vec<Value>> {
        self.ensure_initialized()?;
        Ok(self.items.iter().map(|v| v.field(field)).collect())
    }

    pub fn count(&self) -> Result<usize> {
        self.ensure_initialized()?;
        Ok(self.items.len())
    }

    /// True when the item has a non null primary key shared by some current
    /// item. A null key never matches, including another null keyed item.
    pub fn contains(&self, item: &dyn Record) -> Result<bool> {
        self.ensure_initialized()?;
        Ok(self.position(&item.primary_key()).is_some())
    }

    /// Append the items that are not already present, in argument order,
    /// mirroring each append onto the inverse side. Any add call on the
    /// owning side marks the collection dirty, even when every item was
    /// already present: the caller signalled an intended write.
    pub fn add<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = RecordRef>,
    {
        self.ensure_initialized()?;
        for item in items {
            if self.position(&item.primary_key()).is_none() {
                self.sync_inverse(&item, InverseOp::Add)?;
                self.items.push(item);
            }
        }
        self.dirty = self.descriptor.owning_side;
        Ok(())
    }

    /// Remove the items present by primary key, preserving the relative order
    /// of the remainder. Items not present are skipped. Same dirty policy as
    /// [`RelationCollection::add`].
    pub fn remove<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = RecordRef>,
    {
        self.ensure_initialized()?;
        for item in items {
            if let Some(index) = self.position(&item.primary_key()) {
                self.sync_inverse(&item, InverseOp::Remove)?;
                self.items.remove(index);
            }
        }
        self.dirty = self.descriptor.owning_side;
        Ok(())
    }

    pub fn remove_all(&mut self) -> Result<()> {
        let items = self.items()?;
        self.remove(items)
    }

    /// Replace the contents with the given items. With `hydrate` the
    /// collection is forced initialized first, so a prior fetch can be seeded
    /// without a load, and left clean afterwards: hydration from storage is
    /// not a change even though it routes through remove and add.
    pub fn set<I>(&mut self, items: I, hydrate: bool) -> Result<()>
    where
        I: IntoIterator<Item = RecordRef>,
    {
        if hydrate {
            self.initialized = true;
        }
        self.remove_all()?;
        self.add(items)?;
        if hydrate {
            self.dirty = false;
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        Err(UninitializedAccess {
            target: self.descriptor.target_entity.clone(),
            owner_key: self
                .owner
                .upgrade()
                .map(|v| v.primary_key())
                .unwrap_or_default(),
        }
        .into())
    }

    /// Index of the item sharing the given primary key. A null key matches
    /// nothing.
    fn position(&self, key: &Value) -> Option<usize> {
        if key.is_null() {
            return None;
        }
        self.items.iter().position(|v| v.primary_key() == *key)
    }

    fn keys(&self) -> Vec<Value> {
        self.items.iter().map(|v| v.primary_key()).collect()
    }

    /// Mirror an add or remove onto the inverse collection of the affected
    /// item. Only the owning side synchronizes, only when the relation names
    /// an inverse property, and only when that inverse collection is already
    /// loaded: a lazy collection that was never touched stays untouched.
    fn sync_inverse(&self, item: &RecordRef, op: InverseOp) -> Result<()> {
        if !self.descriptor.owning_side {
            return Ok(());
        }
        let Some(name) = self.descriptor.inverse_relation.as_deref() else {
            return Ok(());
        };
        let Some(inverse) = item.collection(name) else {
            return Ok(());
        };
        // A self referential relation can hand back the collection currently
        // being mutated: skip the sync instead of deadlocking on it.
        let Ok(mut inverse) = inverse.try_lock() else {
            log::debug!("Skipping the inverse sync of {:?}: the collection is locked", name);
            return Ok(());
        };
        if !inverse.is_initialized(false) {
            return Ok(());
        }
        let owner = self.owner()?;
        match op {
            InverseOp::Add => inverse.add([owner]),
            InverseOp::Remove => inverse.remove([owner]),
        }
    }

    /// Seed `items` with reference-only entities resolved through the join
    /// table. The owning side carries the join configuration; the inverse
    /// side borrows it from the owning relation on the target entity, with
    /// the column roles swapped.
    async fn load_from_pivot<Exec, Reg>(&mut self, executor: &mut Exec, registry: &Reg) -> Result<()>
    where
        Exec: StorageAdapter,
        Reg: EntityRegistry,
    {
        let owner_key = self.owner()?.primary_key();
        let JoinTable {
            table,
            owner_column,
            target_column,
        } = self.join_table(registry)?.clone();
        let (filter_column, key_column) = if self.descriptor.owning_side {
            (owner_column, target_column)
        } else {
            (target_column, owner_column)
        };
        let condition = Condition::equals(filter_column, owner_key);
        let rows: Vec<RowLabeled> = executor
            .fetch_rows(&table, &condition)
            .try_collect()
            .await
            .with_context(|| {
                format!(
                    "Failed to resolve the {} membership through the {} join table",
                    self.descriptor.target_entity, table
                )
            })?;
        log::debug!(
            "Join table {} produced {} {} references",
            table,
            rows.len(),
            self.descriptor.target_entity,
        );
        for row in rows {
            let key = row.require(&key_column)?.clone();
            if self.position(&key).is_none() {
                self.items
                    .push(registry.reference(&self.descriptor.target_entity, key)?);
            }
        }
        Ok(())
    }

    fn join_table<'a>(&'a self, registry: &'a impl EntityRegistry) -> Result<&'a JoinTable> {
        let descriptor = if self.descriptor.owning_side {
            &*self.descriptor
        } else {
            self.inverse_descriptor(registry)?
        };
        let RelationKind::ManyToMany {
            join: Some(join), ..
        } = &descriptor.kind
        else {
            return Err(Error::msg(format!(
                "The {} relation does not declare a join table",
                descriptor.target_entity
            )));
        };
        Ok(join)
    }

    /// The owning relation on the target entity type, looked up by the
    /// inverse property name. The non owning side has no storage
    /// configuration of its own and reads the owning side's instead.
    fn inverse_descriptor<'a>(
        &self,
        registry: &'a impl EntityRegistry,
    ) -> Result<&'a RelationDescriptor> {
        let name = self.descriptor.inverse_relation.as_deref().ok_or_else(|| {
            Error::msg(format!(
                "The inverse side of the {} relation names no inverse property to borrow the owning configuration from",
                self.descriptor.target_entity
            ))
        })?;
        registry
            .relation(&self.descriptor.target_entity, name)
            .ok_or_else(|| {
                Error::msg(format!(
                    "No relation {:?} is registered on the {} entity",
                    name, self.descriptor.target_entity
                ))
            })
    }

    /// The fetch condition for the relation, a pure function of the
    /// descriptor and the current state.
    fn fetch_condition(&self, pivot: bool, registry: &impl EntityRegistry) -> Result<Condition> {
        let owner_key = self.owner()?.primary_key();
        match &self.descriptor.kind {
            RelationKind::OneToMany { foreign_key } => {
                Ok(Condition::equals(foreign_key.clone(), owner_key))
            }
            RelationKind::ManyToMany { .. } if self.descriptor.owning_side || pivot => {
                Ok(Condition::contains(
                    registry.primary_key_column(&self.descriptor.target_entity),
                    self.keys(),
                ))
            }
            RelationKind::ManyToMany { .. } => {
                let inverse = self.inverse_descriptor(registry)?;
                let RelationKind::ManyToMany {
                    foreign_key: Some(foreign_key),
                    ..
                } = &inverse.kind
                else {
                    return Err(Error::msg(format!(
                        "The owning {} relation declares no foreign key column to filter by",
                        inverse.target_entity
                    )));
                };
                Ok(Condition::equals(foreign_key.clone(), owner_key))
            }
        }
    }
}
