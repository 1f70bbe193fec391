//! Ordered startup jobs with per-step outcome capture.
//!
//! A [`StartupPlan`] is a fixed list of job names run through the
//! dispatcher in order during process bring-up (cache warming, registering
//! defaults, announcing the service). A failing step is recorded and the
//! remaining steps still run; bring-up never aborts halfway on one bad job.

use tracing::warn;

use switchyard_core::Value;

use super::dispatcher::Dispatcher;

/// Outcome of one startup step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// The job that ran.
    pub job: String,
    /// The job's return value, or its error description when `failed`.
    pub payload: Value,
    /// Whether the step raised instead of returning.
    pub failed: bool,
}

/// A fixed, ordered list of named startup jobs.
///
/// The list is set at construction; there is no way to add steps after the
/// plan exists, so bring-up order is fully determined by the wiring code.
pub struct StartupPlan {
    jobs: Vec<String>,
}

impl StartupPlan {
    /// Creates a plan running the given jobs in the given order.
    #[must_use]
    pub fn new<I, S>(jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            jobs: jobs.into_iter().map(Into::into).collect(),
        }
    }

    /// The planned jobs, in execution order.
    #[must_use]
    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    /// Runs every step in order, collecting one report per step.
    ///
    /// Each job is dispatched with a null payload. A step that fails is
    /// reported with its error description and execution continues.
    pub async fn run(&self, dispatcher: &Dispatcher) -> Vec<StepReport> {
        let mut reports = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let report = match dispatcher.dispatch(job, Value::Null).await {
                Ok(payload) => StepReport {
                    job: job.clone(),
                    payload,
                    failed: false,
                },
                Err(err) => {
                    warn!(job = %job, error = %err, "startup step failed");
                    StepReport {
                        job: job.clone(),
                        payload: Value::String(format!("{err:#}")),
                        failed: true,
                    }
                }
            };
            reports.push(report);
        }
        reports
    }
}
