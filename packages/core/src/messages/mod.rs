//! Wire-compatible record shapes for queue channels.
//!
//! All types use named `MsgPack` serialization (`rmp_serde::to_vec_named()`)
//! with camelCase field names, so records written by this crate are readable
//! by any consumer speaking the same map-based wire format.

pub mod queue;

pub use queue::{
    decode_message, encode_message, CodecError, QueueMessage, Task, TaskResult,
};
