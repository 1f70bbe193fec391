//! Queue channels: the sole storage-facing primitive of the coordination layer.
//!
//! A channel is a named, durable FIFO of task/result records. This module
//! defines the narrow accessor trait ([`TaskQueue`]) the rest of the system
//! consumes, plus the in-process engine ([`MemoryQueue`]) used for tests and
//! single-process deployments. External backends implement the same trait.

pub mod channel;
pub mod memory;

pub use channel::{Delivery, QueueError, TaskQueue};
pub use memory::MemoryQueue;
