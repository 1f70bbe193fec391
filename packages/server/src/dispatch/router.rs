//! Router forwarder and the `send` entry point.
//!
//! [`Courier::send`] wraps any job into a `router.process` envelope and puts
//! it on the well-known router channel. The worker loop bound to that
//! channel runs a [`RouterProcessor`], which unwraps the envelope and either
//! re-publishes the inner job onto its target service's channel or executes
//! it locally. Senders therefore reach any named job without knowing which
//! physical channel ultimately executes it, at the cost of one extra hop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use switchyard_core::{QueueMessage, Task, TaskResult, Value};

use super::dispatcher::{DispatchError, Dispatcher};
use super::worker::{Disposition, TaskProcessor};
use crate::queue::{QueueError, TaskQueue};

/// Well-known channel the router's worker loop consumes.
pub const ROUTER_CHANNEL: &str = "router";

/// Job name carried by every router envelope.
pub const ROUTER_JOB: &str = "router.process";

// ---------------------------------------------------------------------------
// RoutingTable
// ---------------------------------------------------------------------------

/// Builder collecting service-prefix -> channel routes before the table
/// freezes.
#[derive(Default)]
pub struct RoutingTableBuilder {
    routes: HashMap<String, String>,
}

impl RoutingTableBuilder {
    /// Maps a service prefix (the part of a job name before the first `.`)
    /// to the channel its worker loop consumes.
    #[must_use]
    pub fn route(mut self, service: impl Into<String>, channel: impl Into<String>) -> Self {
        self.routes.insert(service.into(), channel.into());
        self
    }

    /// Freezes the routes into an immutable [`RoutingTable`].
    #[must_use]
    pub fn build(self) -> RoutingTable {
        RoutingTable {
            routes: self.routes,
        }
    }
}

/// Immutable service-prefix -> channel map, built once at startup.
pub struct RoutingTable {
    routes: HashMap<String, String>,
}

impl RoutingTable {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::default()
    }

    /// Resolves the target channel for a job name, if its service prefix
    /// is routed. A job without a `.` has no prefix and is never routed.
    #[must_use]
    pub fn channel_for_job(&self, job: &str) -> Option<&str> {
        let (service, _) = job.split_once('.')?;
        self.routes.get(service).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// RouterProcessor
// ---------------------------------------------------------------------------

/// [`TaskProcessor`] for the router channel.
///
/// Precedence: an explicit route wins over the router's own dispatcher;
/// local execution is the fallback for jobs the router itself owns. A job
/// covered by neither fails with `JobNotFound`, which the worker loop turns
/// into a failed result for the caller.
pub struct RouterProcessor {
    table: RoutingTable,
    local: Arc<Dispatcher>,
    queue: Arc<dyn TaskQueue>,
}

impl RouterProcessor {
    /// Builds the router against its routing table, local registry, and
    /// queue accessor.
    #[must_use]
    pub fn new(table: RoutingTable, local: Arc<Dispatcher>, queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            table,
            local,
            queue,
        }
    }
}

#[async_trait]
impl TaskProcessor for RouterProcessor {
    async fn process(&self, task: &Task) -> anyhow::Result<Disposition> {
        if task.job != ROUTER_JOB {
            anyhow::bail!("unexpected job on router channel: {}", task.job);
        }
        let (job, data) = unwrap_envelope(&task.payload)?;

        if let Some(channel) = self.table.channel_for_job(&job) {
            // Forward with the original id and reply channel intact, so the
            // target worker answers the original caller directly.
            let forwarded = Task {
                id: task.id,
                channel: task.channel.clone(),
                job,
                payload: data,
            };
            self.queue
                .put(channel, QueueMessage::Task(forwarded))
                .await?;
            return Ok(Disposition::Forwarded);
        }

        if self.local.contains(&job) {
            let value = self.local.dispatch(&job, data).await?;
            return Ok(Disposition::Reply(value));
        }

        Err(DispatchError::JobNotFound { name: job }.into())
    }
}

/// Builds the `{job, data}` envelope carried by router tasks.
fn wrap_envelope(job: &str, data: Value) -> Value {
    let mut envelope = std::collections::BTreeMap::new();
    envelope.insert("job".to_string(), Value::from(job));
    envelope.insert("data".to_string(), data);
    Value::Map(envelope)
}

/// Splits a router envelope back into the inner job name and its payload.
fn unwrap_envelope(payload: &Value) -> anyhow::Result<(String, Value)> {
    let entries = payload
        .as_map()
        .ok_or_else(|| anyhow::anyhow!("malformed router envelope: payload is not a map"))?;
    let job = entries
        .get("job")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("malformed router envelope: missing job name"))?;
    let data = entries.get("data").cloned().unwrap_or(Value::Null);
    Ok((job.to_string(), data))
}

// ---------------------------------------------------------------------------
// Courier
// ---------------------------------------------------------------------------

/// The public send API: the only client-facing call for triggering
/// remote/async work.
///
/// Holds its dependencies explicitly; there is no ambient context. Clone is
/// cheap (one `Arc` and one string).
#[derive(Clone)]
pub struct Courier {
    queue: Arc<dyn TaskQueue>,
    router_channel: String,
}

impl Courier {
    /// Binds the courier to a queue, targeting the default router channel.
    #[must_use]
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            queue,
            router_channel: ROUTER_CHANNEL.to_string(),
        }
    }

    /// Overrides the router channel name (deployments running several
    /// coordination domains on one queue).
    #[must_use]
    pub fn with_router_channel(mut self, channel: impl Into<String>) -> Self {
        self.router_channel = channel.into();
        self
    }

    /// Sends a fire-and-forget job: no reply channel, no result, ever.
    ///
    /// Returns the task's correlation id for logging.
    ///
    /// # Errors
    ///
    /// Only queue backend errors; delivery itself is at-most-once.
    pub async fn send(&self, job: &str, payload: Value) -> Result<Uuid, QueueError> {
        let task = Task::new(ROUTER_JOB, wrap_envelope(job, payload));
        let id = task.id;
        self.queue
            .put(&self.router_channel, QueueMessage::Task(task))
            .await?;
        Ok(id)
    }

    /// Sends a job expecting a correlated result on `reply_channel`.
    ///
    /// Returns the correlation id the eventual [`TaskResult`] will carry.
    ///
    /// # Errors
    ///
    /// Only queue backend errors.
    pub async fn send_with_reply(
        &self,
        job: &str,
        payload: Value,
        reply_channel: &str,
    ) -> Result<Uuid, QueueError> {
        let task = Task::new(ROUTER_JOB, wrap_envelope(job, payload)).with_reply(reply_channel);
        let id = task.id;
        self.queue
            .put(&self.router_channel, QueueMessage::Task(task))
            .await?;
        Ok(id)
    }

    /// Takes and acks one result off a reply channel.
    ///
    /// Single-poll semantics: returns `None` when the channel is empty;
    /// waiting and backoff are the caller's. A task record found on a reply
    /// channel is a wiring error and is dropped with a warning.
    ///
    /// # Errors
    ///
    /// Only queue backend errors.
    pub async fn poll_reply(&self, channel: &str) -> Result<Option<TaskResult>, QueueError> {
        let Some(delivery) = self.queue.take(channel).await? else {
            return Ok(None);
        };
        self.queue.ack(&delivery).await?;
        match delivery.message {
            QueueMessage::Result(result) => Ok(Some(result)),
            QueueMessage::Task(task) => {
                warn!(
                    channel = %channel,
                    job = %task.job,
                    "dropping task record taken from a reply channel"
                );
                Ok(None)
            }
        }
    }
}
