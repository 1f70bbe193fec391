//! Cross-service lookup: the service pool, query proxy, and mock seam.
//!
//! Any component may ask the pool for another service's records and issue
//! synchronous-style filtered reads against them, bypassing the queue
//! entirely. In test contexts the mock registry intercepts resolution and
//! queries with canned data, so cross-service tests run without standing
//! up every dependent service.

pub mod mock;
pub mod proxy;
pub mod registry;
pub mod store;

pub use mock::{MockRegistry, MockRule};
pub use proxy::{QueryError, ServiceProxy};
pub use registry::{PoolError, ServiceHandle, ServicePool, ServiceResolver, StaticResolver};
pub use store::{MemoryStore, NullStore, StoreAccessor};
