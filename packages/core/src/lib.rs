//! Switchyard Core -- value model, task/result records, and queue wire codec.

pub mod messages;
pub mod types;

pub use messages::{
    decode_message, encode_message, CodecError, QueueMessage, Task, TaskResult,
};
pub use types::{filter_from_pairs, Filter, Record, Value};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
