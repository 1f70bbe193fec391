//! Record store accessor: the narrow capability a service handle holds.
//!
//! Defines [`StoreAccessor`], the seam to the external storage collaborator,
//! plus the in-memory implementation used by tests and single-process
//! deployments and the no-op store backing mock-only proxies.

use async_trait::async_trait;
use dashmap::DashMap;

use switchyard_core::{Filter, Record};

/// Minimal per-service record access used by the query proxy.
///
/// Collections are insertion-ordered sequences of records; `list` returns
/// them in that order. Supplied externally; used as `Arc<dyn StoreAccessor>`.
#[async_trait]
pub trait StoreAccessor: Send + Sync {
    /// All records of a collection, in insertion order. An unknown
    /// collection is an empty one.
    async fn list(&self, collection: &str) -> anyhow::Result<Vec<Record>>;

    /// Appends a record, returning it as stored (a real backend may assign
    /// fields such as generated ids).
    async fn insert(&self, collection: &str, record: Record) -> anyhow::Result<Record>;

    /// Removes every record matching the filter, returning how many went.
    async fn remove(&self, collection: &str, filter: &Filter) -> anyhow::Result<usize>;
}

/// In-memory store keeping one insertion-ordered `Vec` per collection.
pub struct MemoryStore {
    collections: DashMap<String, Vec<Record>>,
}

impl MemoryStore {
    /// Creates a store with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }

    /// Seeds a collection with records, replacing any existing content.
    pub fn seed<I>(&self, collection: impl Into<String>, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        self.collections
            .insert(collection.into(), records.into_iter().collect());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreAccessor for MemoryStore {
    async fn list(&self, collection: &str) -> anyhow::Result<Vec<Record>> {
        Ok(self
            .collections
            .get(collection)
            .map(|records| records.value().clone())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, record: Record) -> anyhow::Result<Record> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn remove(&self, collection: &str, filter: &Filter) -> anyhow::Result<usize> {
        let Some(mut records) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = records.len();
        records.retain(|record| !record.matches(filter));
        Ok(before - records.len())
    }
}

/// No-op store for proxies that must never touch real storage.
///
/// Reads are empty, writes succeed without effect. Backs mock-only service
/// handles, where every meaningful answer comes from the mock registry.
pub struct NullStore;

#[async_trait]
impl StoreAccessor for NullStore {
    async fn list(&self, _collection: &str) -> anyhow::Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn insert(&self, _collection: &str, record: Record) -> anyhow::Result<Record> {
        Ok(record)
    }

    async fn remove(&self, _collection: &str, _filter: &Filter) -> anyhow::Result<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use switchyard_core::{filter_from_pairs, Value};

    use super::*;

    fn record(id: i64, v: &str) -> Record {
        Record::from_pairs([("id", Value::Int(id)), ("v", Value::from(v))])
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = MemoryStore::new();
        store.insert("data", record(3, "test")).await.unwrap();
        store.insert("data", record(1, "test")).await.unwrap();
        store.insert("data", record(2, "other")).await.unwrap();

        let records = store.list("data").await.unwrap();
        let ids: Vec<_> = records
            .iter()
            .map(|r| r.get("id").cloned().unwrap())
            .collect();
        assert_eq!(ids, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[tokio::test]
    async fn unknown_collection_lists_empty() {
        let store = MemoryStore::new();
        assert!(store.list("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seed_replaces_collection_content() {
        let store = MemoryStore::new();
        store.insert("data", record(1, "old")).await.unwrap();
        store.seed("data", [record(7, "new")]);

        let records = store.list("data").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("id"), Some(&Value::Int(7)));
    }

    #[tokio::test]
    async fn remove_takes_out_matching_records_only() {
        let store = MemoryStore::new();
        store.insert("data", record(1, "a")).await.unwrap();
        store.insert("data", record(2, "b")).await.unwrap();
        store.insert("data", record(3, "a")).await.unwrap();

        let removed = store
            .remove("data", &filter_from_pairs([("v", Value::from("a"))]))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let left = store.list("data").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].get("id"), Some(&Value::Int(2)));

        // Removing from an unknown collection is a no-op.
        assert_eq!(store.remove("ghost", &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn null_store_reads_empty_and_discards_writes() {
        let store = NullStore;
        assert!(store.list("any").await.unwrap().is_empty());

        let inserted = store.insert("any", record(1, "x")).await.unwrap();
        assert_eq!(inserted.get("id"), Some(&Value::Int(1)));
        assert!(store.list("any").await.unwrap().is_empty());

        assert_eq!(store.remove("any", &Filter::new()).await.unwrap(), 0);
    }
}
