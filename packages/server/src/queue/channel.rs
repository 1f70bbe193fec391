//! Queue channel accessor trait and delivery receipts.
//!
//! Defines [`TaskQueue`], the contract between the coordination layer and
//! the storage collaborator that actually holds the channels. The record
//! shapes it moves are defined in `switchyard-core`; the wire format of the
//! channel itself belongs to the backend.

use async_trait::async_trait;

use switchyard_core::QueueMessage;

/// A record handed out by [`TaskQueue::take`].
///
/// `seq` is per-channel monotonic and, together with `channel`, identifies
/// the record for [`TaskQueue::ack`]. Consumers treat it as opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Channel the record was taken from.
    pub channel: String,
    /// Per-channel monotonic sequence number, assigned at `put`.
    pub seq: u64,
    /// The record itself.
    pub message: QueueMessage,
}

/// Errors from queue channel operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// `ack` named a record the channel is not holding in flight.
    #[error("unknown delivery {seq} on channel {channel}")]
    UnknownDelivery { channel: String, seq: u64 },
    /// The backend failed (connection loss, storage error).
    #[error("queue backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Named FIFO channels of task/result records.
///
/// Channels are independent: FIFO is guaranteed per channel, never across
/// channels. No call blocks indefinitely: `take` is a single non-blocking
/// poll and `put` is fire-and-forget; waiting for more work is entirely the
/// caller's responsibility.
///
/// Delivery is **at-most-once from the consumer's perspective**: the worker
/// loop acks before processing, so a crash between ack and completion loses
/// the task. That is the documented contract, not a defect.
///
/// Used as `Arc<dyn TaskQueue>`; implementations must be safe under
/// concurrent access from multiple worker loops.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Appends a record at the channel's tail.
    async fn put(&self, channel: &str, message: QueueMessage) -> Result<(), QueueError>;

    /// Takes the oldest unconsumed record, or `None` if the channel is empty.
    ///
    /// A taken record is reserved: no later `take` returns it again. It is
    /// permanently discarded only by [`ack`](TaskQueue::ack); there is no
    /// redelivery of taken-but-unacked records.
    async fn take(&self, channel: &str) -> Result<Option<Delivery>, QueueError>;

    /// Permanently discards a previously taken record.
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;
}
