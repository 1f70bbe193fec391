//! Worker loop: the single-threaded consumer bound to one channel.
//!
//! Each poll takes the oldest record, **acks it before any processing**
//! (at-most-once delivery, by contract), runs the processor, and puts a
//! correlated result on the task's reply channel when one is named.
//! Processing errors are converted into failed results at the loop
//! boundary; they never escape and never stall the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{info, warn};

use switchyard_core::{QueueMessage, Task, TaskResult, Value};

use super::dispatcher::Dispatcher;
use crate::queue::{QueueError, TaskQueue};

// ---------------------------------------------------------------------------
// TaskProcessor trait
// ---------------------------------------------------------------------------

/// What became of a successfully processed task.
#[derive(Debug)]
pub enum Disposition {
    /// The handler produced a value; reply if the task names a channel.
    Reply(Value),
    /// The task was re-published onto another channel; whoever owns that
    /// channel now carries the reply obligation.
    Forwarded,
}

/// Processes one task taken off a channel.
///
/// [`DispatchProcessor`] runs local handlers;
/// [`RouterProcessor`](super::router::RouterProcessor) forwards wrapped jobs.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Handles a single task. An error here becomes a failed result.
    async fn process(&self, task: &Task) -> anyhow::Result<Disposition>;
}

/// [`TaskProcessor`] that dispatches the task's job through a local registry.
pub struct DispatchProcessor {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchProcessor {
    /// Wraps a dispatcher for use by a worker loop.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl TaskProcessor for DispatchProcessor {
    async fn process(&self, task: &Task) -> anyhow::Result<Disposition> {
        let value = self.dispatcher.dispatch(&task.job, task.payload.clone()).await?;
        Ok(Disposition::Reply(value))
    }
}

// ---------------------------------------------------------------------------
// WorkerLoop
// ---------------------------------------------------------------------------

/// Observable worker state machine: `Idle` <-> `Processing`, `Stopped` after
/// shutdown. There is no terminal state short of external shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for work; the next poll may take a task.
    Idle,
    /// A task is being processed. At most one at a time per worker.
    Processing,
    /// The spawned loop has exited.
    Stopped,
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polled {
    /// The channel was empty; the worker stayed idle.
    Empty,
    /// One record was consumed (processed or dropped as malformed).
    Processed,
}

/// Single-threaded consumer bound to one channel.
///
/// Processes at most one task at a time; there is no intra-channel
/// concurrency. Multiple workers may own distinct channels and run
/// concurrently, sharing nothing but the queue itself.
///
/// `poll_once` is the whole contract: polling cadence, backoff, and
/// suspension are the caller's. [`WorkerLoop::spawn`] provides the common
/// interval-driven loop for callers that do not need their own scheduling.
pub struct WorkerLoop {
    channel: String,
    queue: Arc<dyn TaskQueue>,
    processor: Arc<dyn TaskProcessor>,
    state: Arc<ArcSwap<WorkerState>>,
}

impl WorkerLoop {
    /// Binds a worker to its channel.
    #[must_use]
    pub fn new(
        channel: impl Into<String>,
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn TaskProcessor>,
    ) -> Self {
        Self {
            channel: channel.into(),
            queue,
            processor,
            state: Arc::new(ArcSwap::from_pointee(WorkerState::Idle)),
        }
    }

    /// The channel this worker consumes.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Current state of the worker's state machine.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        **self.state.load()
    }

    /// Performs one non-blocking poll of the worker's channel.
    ///
    /// Takes the oldest record, acks it immediately, processes it, and
    /// replies when the task names a reply channel. Processing failures are
    /// converted into failed results here and never propagate.
    ///
    /// # Errors
    ///
    /// Only queue backend errors surface; `spawn`'s loop logs and survives
    /// them, direct callers decide for themselves.
    pub async fn poll_once(&self) -> Result<Polled, QueueError> {
        let Some(delivery) = self.queue.take(&self.channel).await? else {
            return Ok(Polled::Empty);
        };

        // Ack before processing: at-most-once. A crash from here on loses
        // the task instead of redelivering it.
        self.queue.ack(&delivery).await?;

        let QueueMessage::Task(task) = delivery.message else {
            warn!(
                channel = %self.channel,
                seq = delivery.seq,
                "dropping result record taken from a work channel"
            );
            return Ok(Polled::Processed);
        };

        self.state.store(Arc::new(WorkerState::Processing));
        let started = Instant::now();
        let outcome = self.run_task(&task).await;
        self.state.store(Arc::new(WorkerState::Idle));
        let outcome = outcome?;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            channel = %self.channel,
            job = %task.job,
            task_id = %task.id,
            duration_ms,
            outcome,
            "task complete"
        );

        Ok(Polled::Processed)
    }

    /// Runs the processor and performs the reply step. Returns the outcome
    /// label for logging; only queue errors propagate.
    async fn run_task(&self, task: &Task) -> Result<&'static str, QueueError> {
        match self.processor.process(task).await {
            Ok(Disposition::Reply(value)) => {
                if let Some(reply) = &task.channel {
                    let result = TaskResult::ok(task.id, value);
                    self.queue.put(reply, QueueMessage::Result(result)).await?;
                }
                Ok("ok")
            }
            Ok(Disposition::Forwarded) => Ok("forwarded"),
            Err(err) => {
                if let Some(reply) = &task.channel {
                    // {:#} renders the whole error chain, so the caller sees
                    // the handler's own message, not just the boundary label.
                    let result = TaskResult::failure(task.id, format!("{err:#}"));
                    self.queue.put(reply, QueueMessage::Result(result)).await?;
                }
                Ok("failed")
            }
        }
    }

    /// Spawns the interval-driven loop: each tick drains the channel until
    /// empty, then waits for the next tick or shutdown.
    #[must_use]
    pub fn spawn(self, poll_interval: Duration) -> WorkerHandle {
        let state = Arc::clone(&self.state);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tick.tick() => loop {
                        match self.poll_once().await {
                            Ok(Polled::Processed) => {}
                            Ok(Polled::Empty) => break,
                            Err(err) => {
                                warn!(channel = %self.channel, error = %err, "queue poll failed");
                                break;
                            }
                        }
                    },
                }
            }
            self.state.store(Arc::new(WorkerState::Stopped));
        });

        WorkerHandle {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            state,
        }
    }
}

/// Handle to a spawned worker loop.
pub struct WorkerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
    state: Arc<ArcSwap<WorkerState>>,
}

impl WorkerHandle {
    /// Current state of the spawned worker.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        **self.state.load()
    }

    /// Stops the worker gracefully, waiting for the loop task to finish.
    /// A task already in flight completes before the loop exits.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
