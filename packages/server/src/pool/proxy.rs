//! Per-service query API over a resolved handle.
//!
//! Every method checks the mock registry first (target
//! `"service.collection"`, args pattern = the filter) and only then touches
//! the real store. Results are computed fresh per call; nothing here is
//! cached, so repeated calls observe the backing collection as it mutates.

use std::sync::Arc;

use switchyard_core::{Filter, Record, Value};

use super::mock::MockRegistry;
use super::registry::ServiceHandle;

/// Errors from query operations.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// `find_or_fail` matched nothing.
    #[error("record not found in {collection}")]
    RecordNotFound { collection: String },
    /// The store accessor failed.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Filtered query interface bound to one service handle.
///
/// Cheap to clone and to discard; the handle it borrows stays owned by the
/// pool.
#[derive(Clone)]
pub struct ServiceProxy {
    handle: Arc<ServiceHandle>,
    mocks: Arc<MockRegistry>,
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("service_name", &self.handle.name)
            .field("channel", &self.handle.channel)
            .finish_non_exhaustive()
    }
}

impl ServiceProxy {
    /// Binds a proxy to a handle and the pool's mock registry.
    #[must_use]
    pub fn new(handle: Arc<ServiceHandle>, mocks: Arc<MockRegistry>) -> Self {
        Self { handle, mocks }
    }

    /// Name of the service this proxy reads.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.handle.name
    }

    /// Channel of the service's worker loop.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.handle.channel
    }

    /// Whether two proxies are bound to the same resolved handle.
    #[must_use]
    pub fn shares_handle_with(&self, other: &ServiceProxy) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    fn mock_target(&self, collection: &str) -> String {
        format!("{}.{}", self.handle.name, collection)
    }

    /// All records matching every key of the filter, in the store's
    /// insertion order. An empty filter returns the whole collection.
    ///
    /// # Errors
    ///
    /// [`QueryError::Store`] on accessor failure.
    pub async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>, QueryError> {
        if let Some(response) = self.mocks.lookup(&self.mock_target(collection), filter) {
            return Ok(records_from_value(&response));
        }

        let records = self.handle.store.list(collection).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.matches(filter))
            .collect())
    }

    /// First matching record, or `None`.
    ///
    /// # Errors
    ///
    /// [`QueryError::Store`] on accessor failure.
    pub async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, QueryError> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// First matching record, or [`QueryError::RecordNotFound`].
    ///
    /// The `Option` seam stays in [`find_one`](Self::find_one); this is the
    /// outermost point where absence turns into an error.
    ///
    /// # Errors
    ///
    /// [`QueryError::RecordNotFound`] on a miss, [`QueryError::Store`] on
    /// accessor failure.
    pub async fn find_or_fail(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Record, QueryError> {
        self.find_one(collection, filter)
            .await?
            .ok_or_else(|| QueryError::RecordNotFound {
                collection: collection.to_string(),
            })
    }

    /// First matching record, creating one seeded from the filter when
    /// nothing matches.
    ///
    /// Creation is an independent, immediately committed write; repeated
    /// calls with the same filter return the record created by the first.
    ///
    /// # Errors
    ///
    /// [`QueryError::Store`] on accessor failure.
    pub async fn find_or_create(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Record, QueryError> {
        if let Some(existing) = self.find_one(collection, filter).await? {
            return Ok(existing);
        }
        let created = self
            .handle
            .store
            .insert(collection, Record::from_filter(filter))
            .await?;
        Ok(created)
    }

    /// Removes every matching record, returning how many went.
    ///
    /// Mocked collections report 0 removed: canned data is read-only.
    ///
    /// # Errors
    ///
    /// [`QueryError::Store`] on accessor failure.
    pub async fn remove(&self, collection: &str, filter: &Filter) -> Result<usize, QueryError> {
        if self
            .mocks
            .lookup(&self.mock_target(collection), filter)
            .is_some()
        {
            return Ok(0);
        }
        Ok(self.handle.store.remove(collection, filter).await?)
    }
}

/// Converts a mock response into the record sequence `find` returns.
///
/// Arrays are record lists, a map is a single record, `Null` is an empty
/// result, and any other scalar wraps as `{ "value": scalar }`.
fn records_from_value(value: &Value) -> Vec<Record> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(record_from_value).collect(),
        other => vec![record_from_value(other)],
    }
}

fn record_from_value(value: &Value) -> Record {
    match value {
        Value::Map(entries) => Record::from(entries.clone()),
        other => {
            let mut record = Record::new();
            record.set("value", other.clone());
            record
        }
    }
}

#[cfg(test)]
mod tests {
    use switchyard_core::filter_from_pairs;

    use super::*;
    use crate::pool::store::{MemoryStore, StoreAccessor};

    fn seeded_proxy() -> (Arc<MemoryStore>, Arc<MockRegistry>, ServiceProxy) {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            "data",
            [
                Record::from_pairs([("id", Value::Int(1)), ("v", Value::from("a"))]),
                Record::from_pairs([("id", Value::Int(2)), ("v", Value::from("b"))]),
                Record::from_pairs([("id", Value::Int(3)), ("v", Value::from("a"))]),
            ],
        );

        let mocks = Arc::new(MockRegistry::new());
        let handle = Arc::new(ServiceHandle {
            name: "tester".to_string(),
            channel: "tester".to_string(),
            store: Arc::clone(&store) as Arc<dyn StoreAccessor>,
        });
        let proxy = ServiceProxy::new(handle, Arc::clone(&mocks));
        (store, mocks, proxy)
    }

    #[tokio::test]
    async fn find_filters_and_preserves_order() {
        let (_store, _mocks, proxy) = seeded_proxy();

        let matches = proxy
            .find("data", &filter_from_pairs([("v", Value::from("a"))]))
            .await
            .unwrap();
        let ids: Vec<_> = matches
            .iter()
            .map(|r| r.get("id").cloned().unwrap())
            .collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(3)]);

        let all = proxy.find("data", &Filter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn find_is_fresh_per_call() {
        let (store, _mocks, proxy) = seeded_proxy();

        assert_eq!(proxy.find("data", &Filter::new()).await.unwrap().len(), 3);

        store
            .insert(
                "data",
                Record::from_pairs([("id", Value::Int(4)), ("v", Value::from("a"))]),
            )
            .await
            .unwrap();

        assert_eq!(proxy.find("data", &Filter::new()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn find_one_returns_first_match_or_none() {
        let (_store, _mocks, proxy) = seeded_proxy();

        let first = proxy
            .find_one("data", &filter_from_pairs([("v", Value::from("a"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.get("id"), Some(&Value::Int(1)));

        let none = proxy
            .find_one("data", &filter_from_pairs([("id", Value::Int(99))]))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn find_or_fail_raises_record_not_found() {
        let (_store, _mocks, proxy) = seeded_proxy();

        let found = proxy
            .find_or_fail("data", &filter_from_pairs([("v", Value::from("a"))]))
            .await
            .unwrap();
        assert_eq!(found.get("id"), Some(&Value::Int(1)));

        let err = proxy
            .find_or_fail("data", &filter_from_pairs([("id", Value::Int(99))]))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::RecordNotFound { collection } if collection == "data"));
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let (_store, _mocks, proxy) = seeded_proxy();
        let filter = filter_from_pairs([("id", Value::Int(5))]);

        let created = proxy.find_or_create("notes", &filter).await.unwrap();
        assert_eq!(created.get("id"), Some(&Value::Int(5)));

        let again = proxy.find_or_create("notes", &filter).await.unwrap();
        assert_eq!(created, again);

        // Exactly one record was created, not two.
        assert_eq!(proxy.find("notes", &Filter::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mock_response_overrides_real_store_until_cleared() {
        let (_store, mocks, proxy) = seeded_proxy();

        mocks.register(
            "tester.data",
            None,
            Value::from_json(serde_json::json!([
                { "id": 10, "v": "mocked" },
                { "id": 11, "v": "mocked" },
            ])),
        );

        let records = proxy.find("data", &Filter::new()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("v"), Some(&Value::from("mocked")));

        // Other collections of the same service are not intercepted.
        assert!(proxy.find("other", &Filter::new()).await.unwrap().is_empty());

        mocks.clear();
        let records = proxy.find("data", &Filter::new()).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("id"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn scalar_and_map_mock_responses_become_records() {
        let (_store, mocks, proxy) = seeded_proxy();

        mocks.register(
            "tester.summary",
            None,
            Value::from_json(serde_json::json!({ "services": ["a", "b"] })),
        );
        let records = proxy.find("summary", &Filter::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("services"),
            Some(&Value::Array(vec![Value::from("a"), Value::from("b")]))
        );

        mocks.register("tester.flag", None, Value::Bool(true));
        let records = proxy.find("flag", &Filter::new()).await.unwrap();
        assert_eq!(records[0].get("value"), Some(&Value::Bool(true)));

        mocks.register("tester.empty", None, Value::Null);
        assert!(proxy.find("empty", &Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_matches_but_never_mocked_data() {
        let (_store, mocks, proxy) = seeded_proxy();

        let removed = proxy
            .remove("data", &filter_from_pairs([("v", Value::from("a"))]))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(proxy.find("data", &Filter::new()).await.unwrap().len(), 1);

        mocks.register("tester.data", None, Value::Array(Vec::new()));
        let removed = proxy.remove("data", &Filter::new()).await.unwrap();
        assert_eq!(removed, 0);
    }
}
