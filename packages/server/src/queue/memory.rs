//! In-process [`TaskQueue`] implementation backed by [`DashMap`].
//!
//! One entry per channel, each holding a ready FIFO and the set of
//! taken-but-unacked sequence numbers. Suitable for tests and
//! single-process deployments; multi-process setups plug a durable
//! backend into the same trait.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;

use switchyard_core::QueueMessage;

use super::channel::{Delivery, QueueError, TaskQueue};

#[derive(Default)]
struct ChannelQueue {
    /// Next sequence number to assign at `put`. Monotonic per channel.
    next_seq: u64,
    /// Records not yet taken, oldest first.
    ready: VecDeque<Delivery>,
    /// Sequence numbers taken but not yet acked.
    in_flight: HashSet<u64>,
}

/// In-memory queue engine with per-channel FIFO ordering.
///
/// `DashMap` gives fine-grained per-channel locking, so concurrent worker
/// loops on distinct channels never contend and `put`/`take`/`ack` on a
/// shared channel serialize through the channel's own entry.
pub struct MemoryQueue {
    channels: DashMap<String, ChannelQueue>,
}

impl MemoryQueue {
    /// Creates an engine with no channels; channels appear on first `put`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Number of ready (not yet taken) records on a channel.
    #[must_use]
    pub fn ready_len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |q| q.ready.len())
    }

    /// Number of taken-but-unacked records on a channel.
    #[must_use]
    pub fn in_flight_len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |q| q.in_flight.len())
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn put(&self, channel: &str, message: QueueMessage) -> Result<(), QueueError> {
        let mut queue = self.channels.entry(channel.to_string()).or_default();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.ready.push_back(Delivery {
            channel: channel.to_string(),
            seq,
            message,
        });
        Ok(())
    }

    async fn take(&self, channel: &str) -> Result<Option<Delivery>, QueueError> {
        let Some(mut queue) = self.channels.get_mut(channel) else {
            return Ok(None);
        };
        let Some(delivery) = queue.ready.pop_front() else {
            return Ok(None);
        };
        queue.in_flight.insert(delivery.seq);
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let removed = self
            .channels
            .get_mut(&delivery.channel)
            .is_some_and(|mut queue| queue.in_flight.remove(&delivery.seq));

        if removed {
            Ok(())
        } else {
            Err(QueueError::UnknownDelivery {
                channel: delivery.channel.clone(),
                seq: delivery.seq,
            })
        }
    }
}
