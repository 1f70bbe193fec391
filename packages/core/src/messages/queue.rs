//! Task and result records exchanged over queue channels.
//!
//! A [`Task`] asks a worker to run a named job; a [`TaskResult`] carries the
//! correlated outcome back on the task's reply channel. [`QueueMessage`] is
//! the single tagged shape a channel stores, so one `take` call can yield
//! either kind and consumers branch on the `kind` tag.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Value;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of requested work.
///
/// `id` is generated by the sender and globally unique; it is the sole
/// correlation key for a later [`TaskResult`]. The system never
/// deduplicates on it. `channel` names where the result should be put;
/// `None` means fire-and-forget, no reply expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Sender-generated correlation id.
    pub id: Uuid,
    /// Reply channel. Absent (not null) on the wire when no reply is expected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub channel: Option<String>,
    /// Name of the job to run.
    pub job: String,
    /// Arguments handed to the job handler.
    pub payload: Value,
}

impl Task {
    /// Creates a fire-and-forget task with a fresh v4 correlation id.
    #[must_use]
    pub fn new(job: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: None,
            job: job.into(),
            payload,
        }
    }

    /// Sets the reply channel, making the task expect a correlated result.
    #[must_use]
    pub fn with_reply(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

// ---------------------------------------------------------------------------
// TaskResult
// ---------------------------------------------------------------------------

/// The correlated outcome of processing a [`Task`].
///
/// Produced at most once per processed task, and only if the task carried
/// a reply channel. When `failed` is true, `payload` holds a human-readable
/// error description instead of the handler's return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Matches the originating task's `id`.
    pub id: Uuid,
    /// Handler return value, or an error description when `failed`.
    pub payload: Value,
    /// Whether processing raised instead of returning.
    pub failed: bool,
}

impl TaskResult {
    /// Creates a success result carrying the handler's return value.
    #[must_use]
    pub fn ok(id: Uuid, payload: Value) -> Self {
        Self {
            id,
            payload,
            failed: false,
        }
    }

    /// Creates a failure result carrying an error description.
    #[must_use]
    pub fn failure(id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id,
            payload: Value::String(message.into()),
            failed: true,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueMessage + codec
// ---------------------------------------------------------------------------

/// The one record shape queue channels store.
///
/// Internally tagged so the wire form stays a flat named map with a `kind`
/// discriminator next to the record's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueueMessage {
    /// A work request.
    Task(Task),
    /// A correlated outcome.
    Result(TaskResult),
}

impl QueueMessage {
    /// Returns the contained task, if this is a `Task` record.
    #[must_use]
    pub fn as_task(&self) -> Option<&Task> {
        match self {
            QueueMessage::Task(task) => Some(task),
            QueueMessage::Result(_) => None,
        }
    }

    /// Returns the contained result, if this is a `Result` record.
    #[must_use]
    pub fn as_result(&self) -> Option<&TaskResult> {
        match self {
            QueueMessage::Result(result) => Some(result),
            QueueMessage::Task(_) => None,
        }
    }
}

/// Errors from encoding or decoding queue records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("queue record encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("queue record decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Encodes a queue record as a named-map `MsgPack` buffer.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_message(message: &QueueMessage) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(message)?)
}

/// Decodes a queue record from a `MsgPack` buffer.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed input or an unknown `kind`.
pub fn decode_message(bytes: &[u8]) -> Result<QueueMessage, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
