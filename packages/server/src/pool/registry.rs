//! Service pool: resolves service names to cached data-access handles.
//!
//! Resolution is memoized for the life of the process. First resolution of
//! a name is serialized through a per-name `OnceCell` gate, so two
//! concurrent lookups for the same unresolved service invoke the resolver
//! exactly once. Cached handles are owned by the pool; proxies hold
//! non-owning `Arc` references and are never invalidated implicitly.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use super::mock::MockRegistry;
use super::proxy::ServiceProxy;
use super::store::{NullStore, StoreAccessor};

// ---------------------------------------------------------------------------
// ServiceHandle
// ---------------------------------------------------------------------------

/// A resolved service: its name, its worker channel, and record access.
///
/// Created once per process on first [`ServicePool::get`] and cached for
/// the process lifetime. Invalidation, if ever needed, is an explicit
/// external action; the pool never recreates a handle on its own.
pub struct ServiceHandle {
    /// Registered service name.
    pub name: String,
    /// Channel the service's worker loop consumes.
    pub channel: String,
    /// Record access for the service's collections.
    pub store: Arc<dyn StoreAccessor>,
}

/// Errors from service resolution.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The resolver does not know the service and no mock covers it.
    #[error("service not found: {name}")]
    ServiceNotFound { name: String },
    /// The resolver itself failed (registry unreachable, bad address).
    #[error("service resolution failed: {0}")]
    Resolver(#[from] anyhow::Error),
}

/// Resolves a service name to a fresh handle. Supplied externally: real
/// deployments open a store connection and look up the service's channel;
/// tests use [`StaticResolver`].
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    /// Opens a handle for the named service.
    async fn resolve(&self, name: &str) -> Result<ServiceHandle, PoolError>;
}

/// Resolver over a fixed registry of known services.
#[derive(Default)]
pub struct StaticResolver {
    services: DashMap<String, (String, Arc<dyn StoreAccessor>)>,
}

impl StaticResolver {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its channel and store accessor.
    pub fn register(
        &self,
        name: impl Into<String>,
        channel: impl Into<String>,
        store: Arc<dyn StoreAccessor>,
    ) {
        self.services
            .insert(name.into(), (channel.into(), store));
    }
}

#[async_trait]
impl ServiceResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Result<ServiceHandle, PoolError> {
        let entry = self
            .services
            .get(name)
            .ok_or_else(|| PoolError::ServiceNotFound {
                name: name.to_string(),
            })?;
        let (channel, store) = entry.value();
        Ok(ServiceHandle {
            name: name.to_string(),
            channel: channel.clone(),
            store: Arc::clone(store),
        })
    }
}

// ---------------------------------------------------------------------------
// ServicePool
// ---------------------------------------------------------------------------

/// Registry of known services, lazily resolving one handle per name.
pub struct ServicePool {
    resolver: Arc<dyn ServiceResolver>,
    mocks: Arc<MockRegistry>,
    handles: DashMap<String, Arc<OnceCell<Arc<ServiceHandle>>>>,
}

impl ServicePool {
    /// Builds a pool over a resolver and a mock registry. Wiring code that
    /// never mocks passes an empty registry.
    #[must_use]
    pub fn new(resolver: Arc<dyn ServiceResolver>, mocks: Arc<MockRegistry>) -> Self {
        Self {
            resolver,
            mocks,
            handles: DashMap::new(),
        }
    }

    /// Returns a query proxy for the named service.
    ///
    /// Repeated calls are O(1) after the first: the handle is cached for
    /// the process lifetime. An unknown service falls back to the mock
    /// registry; a mock-covered name yields a proxy backed by [`NullStore`]
    /// that is deliberately *not* cached, so clearing the mocks restores
    /// real behavior.
    ///
    /// # Errors
    ///
    /// [`PoolError::ServiceNotFound`] when neither the resolver nor a mock
    /// knows the name; [`PoolError::Resolver`] on backend failure.
    pub async fn get(&self, name: &str) -> Result<ServiceProxy, PoolError> {
        if let Some(handle) = self.cached(name) {
            return Ok(ServiceProxy::new(handle, Arc::clone(&self.mocks)));
        }

        let cell = Arc::clone(
            self.handles
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let resolved = cell
            .get_or_try_init(|| async {
                let handle = self.resolver.resolve(name).await?;
                Ok::<_, PoolError>(Arc::new(handle))
            })
            .await;

        match resolved {
            Ok(handle) => Ok(ServiceProxy::new(
                Arc::clone(handle),
                Arc::clone(&self.mocks),
            )),
            Err(PoolError::ServiceNotFound { name }) if self.mocks.covers_service(&name) => {
                Ok(ServiceProxy::new(
                    Arc::new(ServiceHandle {
                        name: name.clone(),
                        channel: name,
                        store: Arc::new(NullStore),
                    }),
                    Arc::clone(&self.mocks),
                ))
            }
            Err(err) => Err(err),
        }
    }

    fn cached(&self, name: &str) -> Option<Arc<ServiceHandle>> {
        self.handles
            .get(name)
            .and_then(|cell| cell.get().map(Arc::clone))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use switchyard_core::{Record, Value};

    use super::*;
    use crate::pool::store::MemoryStore;

    fn resolver_with_web() -> Arc<StaticResolver> {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            "services",
            [Record::from_pairs([
                ("id", Value::Int(1)),
                ("name", Value::from("tester")),
            ])],
        );
        let resolver = StaticResolver::new();
        resolver.register("web", "web", store);
        Arc::new(resolver)
    }

    #[tokio::test]
    async fn unknown_service_without_mocks_is_an_error() {
        let pool = ServicePool::new(resolver_with_web(), Arc::new(MockRegistry::new()));
        let err = pool.get("nonexistent").await.unwrap_err();
        assert!(matches!(err, PoolError::ServiceNotFound { name } if name == "nonexistent"));
    }

    #[tokio::test]
    async fn resolution_is_memoized_per_name() {
        let pool = ServicePool::new(resolver_with_web(), Arc::new(MockRegistry::new()));

        let first = pool.get("web").await.unwrap();
        let second = pool.get("web").await.unwrap();
        assert!(first.shares_handle_with(&second));
    }

    #[tokio::test]
    async fn concurrent_first_resolution_invokes_resolver_once() {
        /// Counts resolve calls and yields before answering, widening the
        /// race window.
        struct CountingResolver {
            calls: AtomicU32,
        }

        #[async_trait]
        impl ServiceResolver for CountingResolver {
            async fn resolve(&self, name: &str) -> Result<ServiceHandle, PoolError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(ServiceHandle {
                    name: name.to_string(),
                    channel: name.to_string(),
                    store: Arc::new(MemoryStore::new()),
                })
            }
        }

        let resolver = Arc::new(CountingResolver {
            calls: AtomicU32::new(0),
        });
        let pool = Arc::new(ServicePool::new(
            Arc::clone(&resolver) as Arc<dyn ServiceResolver>,
            Arc::new(MockRegistry::new()),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move { pool.get("web").await.unwrap() }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mock_coverage_resolves_unknown_services() {
        let mocks = Arc::new(MockRegistry::new());
        mocks.register("guard.session", None, Value::Array(Vec::new()));

        let pool = ServicePool::new(resolver_with_web(), Arc::clone(&mocks));

        let proxy = pool.get("guard").await.unwrap();
        assert_eq!(proxy.service_name(), "guard");

        // Mock-resolved handles are not cached: clearing the registry
        // makes the service unknown again.
        mocks.clear();
        let err = pool.get("guard").await.unwrap_err();
        assert!(matches!(err, PoolError::ServiceNotFound { .. }));
    }

    #[tokio::test]
    async fn known_services_resolve_for_real_even_when_mocked() {
        let mocks = Arc::new(MockRegistry::new());
        mocks.register("web.services", None, Value::Array(Vec::new()));

        let pool = ServicePool::new(resolver_with_web(), Arc::clone(&mocks));
        let proxy = pool.get("web").await.unwrap();

        // The handle is the real one; query interception happens per
        // collection in the proxy, and clearing mocks keeps it usable.
        mocks.clear();
        let records = proxy.find("services", &switchyard_core::Filter::new()).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
