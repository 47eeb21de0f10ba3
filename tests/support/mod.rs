#![allow(dead_code)]

use lasso::{
    Condition, EntityRegistry, Error, JoinTable, Record, RecordRef, RelationCollection,
    RelationDescriptor, RelationKind, Result, RowLabeled, SerializeContext, SharedCollection,
    StorageAdapter, Value,
    stream::{self, Stream},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger.is_test(true);
    let _ = logger.try_init();
}

/// Minimal entity for collection tests: an identity, a load flag and the
/// relation collections it hands out.
pub struct TestRecord {
    pub entity: String,
    pub key: Value,
    pub loaded: bool,
    pub collections: Mutex<HashMap<String, SharedCollection>>,
}

impl TestRecord {
    pub fn new(entity: &str, key: Value, loaded: bool) -> Self {
        Self {
            entity: entity.to_owned(),
            key,
            loaded,
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl Record for TestRecord {
    fn entity_type(&self) -> &str {
        &self.entity
    }
    fn primary_key(&self) -> Value {
        self.key.clone()
    }
    fn is_initialized(&self, recursive: bool) -> bool {
        if !self.loaded {
            return false;
        }
        if !recursive {
            return true;
        }
        self.collections
            .lock()
            .unwrap()
            .values()
            .all(|v| match v.try_lock() {
                Ok(v) => !v.is_initialized(false) || v.is_initialized(true),
                Err(_) => true,
            })
    }
    fn field(&self, name: &str) -> Value {
        if name == "id" {
            self.key.clone()
        } else {
            Value::Null
        }
    }
    fn collection(&self, relation: &str) -> Option<SharedCollection> {
        self.collections.lock().unwrap().get(relation).cloned()
    }
    fn serialize(&self, _context: &SerializeContext<'_>) -> RowLabeled {
        RowLabeled::new(
            vec!["id".to_owned()].into(),
            vec![self.key.clone()].into_boxed_slice(),
        )
    }
}

/// A loaded record kept concrete so tests can reach its collections.
pub fn record(entity: &str, key: impl Into<Value>) -> Arc<TestRecord> {
    Arc::new(TestRecord::new(entity, key.into(), true))
}

/// A loaded record as the erased handle collections work with.
pub fn entity(entity: &str, key: impl Into<Value>) -> RecordRef {
    record(entity, key)
}

/// A reference-only record: primary key known, fields not loaded.
pub fn unloaded(entity: &str, key: impl Into<Value>) -> RecordRef {
    Arc::new(TestRecord::new(entity, key.into(), false))
}

pub fn erased(record: &Arc<TestRecord>) -> RecordRef {
    record.clone()
}

pub fn collection(
    owner: &Arc<TestRecord>,
    descriptor: Arc<RelationDescriptor>,
) -> RelationCollection {
    let weak = Arc::downgrade(owner);
    RelationCollection::new(weak, descriptor)
}

pub fn hydrated(
    owner: &Arc<TestRecord>,
    descriptor: Arc<RelationDescriptor>,
    items: Vec<RecordRef>,
) -> RelationCollection {
    let weak = Arc::downgrade(owner);
    RelationCollection::hydrated(weak, descriptor, items).unwrap()
}

/// Wire a shared collection onto the record so inverse sync can find it.
pub fn attach(
    owner: &Arc<TestRecord>,
    name: &str,
    descriptor: Arc<RelationDescriptor>,
) -> SharedCollection {
    let shared = collection(owner, descriptor).into_shared();
    owner
        .collections
        .lock()
        .unwrap()
        .insert(name.to_owned(), shared.clone());
    shared
}

pub fn one_to_many(
    target: &str,
    foreign_key: &str,
    owning: bool,
    inverse: Option<&str>,
) -> Arc<RelationDescriptor> {
    Arc::new(RelationDescriptor {
        kind: RelationKind::OneToMany {
            foreign_key: foreign_key.to_owned(),
        },
        owning_side: owning,
        inverse_relation: inverse.map(str::to_owned),
        target_entity: target.to_owned(),
    })
}

pub fn many_to_many(
    target: &str,
    owning: bool,
    inverse: Option<&str>,
    foreign_key: Option<&str>,
    join: Option<JoinTable>,
) -> Arc<RelationDescriptor> {
    Arc::new(RelationDescriptor {
        kind: RelationKind::ManyToMany {
            foreign_key: foreign_key.map(str::to_owned),
            join,
        },
        owning_side: owning,
        inverse_relation: inverse.map(str::to_owned),
        target_entity: target.to_owned(),
    })
}

pub fn join_table(table: &str, owner_column: &str, target_column: &str) -> JoinTable {
    JoinTable {
        table: table.to_owned(),
        owner_column: owner_column.to_owned(),
        target_column: target_column.to_owned(),
    }
}

pub fn ids(keys: &[i64]) -> Vec<Value> {
    keys.iter().map(|v| Value::from(*v)).collect()
}

pub fn row(columns: &[(&str, Value)]) -> RowLabeled {
    RowLabeled::new(
        columns
            .iter()
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>()
            .into(),
        columns
            .iter()
            .map(|(_, value)| value.clone())
            .collect::<Vec<_>>()
            .into_boxed_slice(),
    )
}

/// Storage adapter that replays canned results and records every query it
/// receives, so tests can assert on call counts and conditions.
#[derive(Default)]
pub struct MockAdapter {
    pub pivot_table: bool,
    pub pivot_rows: Vec<RowLabeled>,
    pub results: Vec<RecordRef>,
    pub fail: bool,
    pub fetch_calls: usize,
    pub find_calls: usize,
    pub queries: Vec<(String, Condition)>,
    pub populate: Vec<Vec<String>>,
}

impl StorageAdapter for MockAdapter {
    fn uses_pivot_table(&self) -> bool {
        self.pivot_table
    }
    fn fetch_rows(
        &mut self,
        table: &str,
        condition: &Condition,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.fetch_calls += 1;
        self.queries.push((table.to_owned(), condition.clone()));
        let rows: Vec<Result<RowLabeled>> = if self.fail {
            vec![Err(Error::msg("The storage backend is unavailable"))]
        } else {
            self.pivot_rows.clone().into_iter().map(Ok).collect()
        };
        stream::iter(rows)
    }
    fn find(
        &mut self,
        entity: &str,
        condition: &Condition,
        populate: &[&str],
    ) -> impl Stream<Item = Result<RecordRef>> + Send {
        self.find_calls += 1;
        self.queries.push((entity.to_owned(), condition.clone()));
        self.populate
            .push(populate.iter().map(|v| v.to_string()).collect());
        let results: Vec<Result<RecordRef>> = if self.fail {
            vec![Err(Error::msg("The storage backend is unavailable"))]
        } else {
            self.results.clone().into_iter().map(Ok).collect()
        };
        stream::iter(results)
    }
}

/// Registry with explicitly registered relations, building reference-only
/// [`TestRecord`]s and naming every primary key column `id`.
#[derive(Default)]
pub struct MockRegistry {
    relations: HashMap<(String, String), RelationDescriptor>,
}

impl MockRegistry {
    pub fn with(mut self, entity: &str, relation: &str, descriptor: &Arc<RelationDescriptor>) -> Self {
        self.relations.insert(
            (entity.to_owned(), relation.to_owned()),
            (**descriptor).clone(),
        );
        self
    }
}

impl EntityRegistry for MockRegistry {
    fn relation(&self, entity: &str, relation: &str) -> Option<&RelationDescriptor> {
        self.relations
            .get(&(entity.to_owned(), relation.to_owned()))
    }
    fn primary_key_column(&self, _entity: &str) -> &str {
        "id"
    }
    fn reference(&self, entity: &str, key: Value) -> Result<RecordRef> {
        Ok(Arc::new(TestRecord::new(entity, key, false)))
    }
}
