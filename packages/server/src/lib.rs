//! Switchyard Server -- queue channels, worker loops, job routing, and the
//! cross-service lookup pool.

pub mod config;
pub mod dispatch;
pub mod pool;
pub mod queue;

pub use config::{CoordinatorConfig, Settings};
pub use dispatch::{
    handler_fn, Courier, DispatchError, DispatchProcessor, Dispatcher, DispatcherBuilder,
    Disposition, JobHandler, Polled, RouterProcessor, RoutingTable, RoutingTableBuilder,
    StartupPlan, StepReport, TaskProcessor, WorkerHandle, WorkerLoop, WorkerState,
    ROUTER_CHANNEL, ROUTER_JOB,
};
pub use pool::{
    MemoryStore, MockRegistry, MockRule, NullStore, PoolError, QueryError, ServiceHandle,
    ServicePool, ServiceProxy, ServiceResolver, StaticResolver, StoreAccessor,
};
pub use queue::{Delivery, MemoryQueue, QueueError, TaskQueue};
