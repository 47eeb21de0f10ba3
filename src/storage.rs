use crate::{Condition, RecordRef, Result, RowLabeled, stream::Stream};

/// The capability a relation collection requires from the storage layer.
///
/// Deliberately narrow: one raw row lookup for join tables, one entity fetch,
/// and a static property of the engine. Everything else (dialects, pooling,
/// transactions) stays behind the driver.
pub trait StorageAdapter: Send {
    /// Whether the engine models many-to-many relations through an
    /// intermediate join table. A property of the engine, not of any single
    /// relation.
    fn uses_pivot_table(&self) -> bool;

    /// Fetch raw rows from a table, used to resolve join table membership.
    fn fetch_rows(
        &mut self,
        table: &str,
        condition: &Condition,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send;

    /// Fetch constructed entities of the given type, optionally eager
    /// loading the named relations on each result.
    fn find(
        &mut self,
        entity: &str,
        condition: &Condition,
        populate: &[&str],
    ) -> impl Stream<Item = Result<RecordRef>> + Send;
}
