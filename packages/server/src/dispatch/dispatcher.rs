//! Job registry: maps job names to handlers.
//!
//! The table is populated through [`DispatcherBuilder`] during startup and
//! frozen by `build()`; a built [`Dispatcher`] is immutable, so lookups are
//! lock-free for the life of the process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use switchyard_core::Value;

// ---------------------------------------------------------------------------
// JobHandler trait
// ---------------------------------------------------------------------------

/// A registered job implementation.
///
/// Takes the task payload and returns a value, or raises. Errors are
/// captured by the dispatcher and surface as [`DispatchError::Handler`];
/// inside a worker loop they become a failed result, never a crash.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Runs the job against the given payload.
    async fn run(&self, payload: Value) -> anyhow::Result<Value>;
}

/// Adapter wrapping a plain async closure as a [`JobHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn run(&self, payload: Value) -> anyhow::Result<Value> {
        (self.f)(payload).await
    }
}

/// Wraps an async closure as a [`JobHandler`] for registration.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    FnHandler { f }
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Errors from dispatching a job.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler registered under the given name. Names are matched
    /// exactly; there is no wildcard or namespace fallback.
    #[error("job not found: {name}")]
    JobNotFound { name: String },
    /// The handler raised while running; the source error is preserved.
    #[error("job handler failed: {0}")]
    Handler(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Builder collecting handler registrations before the table freezes.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl DispatcherBuilder {
    /// Binds a job name to a handler. Re-registering a name replaces the
    /// previous handler; after `build()` the binding is final.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, handler: impl JobHandler + 'static) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Freezes the table into an immutable [`Dispatcher`].
    #[must_use]
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            handlers: self.handlers,
        }
    }
}

/// Immutable job-name -> handler lookup table.
///
/// Shared as `Arc<Dispatcher>` between worker loops; resolution is an exact
/// string match.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl Dispatcher {
    /// Starts an empty registration builder.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Whether a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Runs the handler registered under `name` against `payload`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::JobNotFound`] for an unregistered name;
    /// [`DispatchError::Handler`] if the handler raises.
    pub async fn dispatch(&self, name: &str, payload: Value) -> Result<Value, DispatchError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| DispatchError::JobNotFound {
                name: name.to_string(),
            })?;
        handler
            .run(payload)
            .await
            .map_err(DispatchError::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .register("test.echo", handler_fn(|payload| async move { Ok(payload) }))
            .register(
                "test.boom",
                handler_fn(|_| async move { anyhow::bail!("boom") }),
            )
            .build()
    }

    #[tokio::test]
    async fn dispatch_runs_registered_handler() {
        let dispatcher = echo_dispatcher();
        let out = dispatcher
            .dispatch("test.echo", Value::from("hello"))
            .await
            .unwrap();
        assert_eq!(out, Value::from("hello"));
    }

    #[tokio::test]
    async fn unknown_job_is_job_not_found() {
        let dispatcher = echo_dispatcher();
        let err = dispatcher.dispatch("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, DispatchError::JobNotFound { name } if name == "nope"));
    }

    #[tokio::test]
    async fn handler_error_is_captured_with_message() {
        let dispatcher = echo_dispatcher();
        let err = dispatcher
            .dispatch("test.boom", Value::Null)
            .await
            .unwrap_err();
        match err {
            DispatchError::Handler(source) => assert_eq!(source.to_string(), "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn last_registration_wins_before_freeze() {
        let dispatcher = Dispatcher::builder()
            .register("job", handler_fn(|_| async move { Ok(Value::from("old")) }))
            .register("job", handler_fn(|_| async move { Ok(Value::from("new")) }))
            .build();
        let out = dispatcher.dispatch("job", Value::Null).await.unwrap();
        assert_eq!(out, Value::from("new"));
    }

    #[test]
    fn contains_reflects_registration() {
        let dispatcher = echo_dispatcher();
        assert!(dispatcher.contains("test.echo"));
        assert!(!dispatcher.contains("test.missing"));
    }
}
