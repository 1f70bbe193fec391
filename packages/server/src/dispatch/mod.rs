//! Job dispatch: registry, worker loops, and the router forwarder.
//!
//! The pipeline mirrors the data flow of the coordination layer:
//!
//! 1. **Registry** (`dispatcher`): job name -> handler, frozen at startup
//! 2. **Worker loop** (`worker`): take -> ack -> dispatch -> reply
//! 3. **Router** (`router`): the well-known channel that re-publishes
//!    wrapped jobs onto their target service's channel
//! 4. **Bootstrap** (`bootstrap`): ordered startup jobs with per-step
//!    outcome capture

pub mod bootstrap;
pub mod dispatcher;
pub mod router;
pub mod worker;

pub use bootstrap::{StartupPlan, StepReport};
pub use dispatcher::{
    handler_fn, DispatchError, Dispatcher, DispatcherBuilder, FnHandler, JobHandler,
};
pub use router::{
    Courier, RouterProcessor, RoutingTable, RoutingTableBuilder, ROUTER_CHANNEL, ROUTER_JOB,
};
pub use worker::{
    DispatchProcessor, Disposition, Polled, TaskProcessor, WorkerHandle, WorkerLoop, WorkerState,
};
