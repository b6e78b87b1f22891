//! Bounded polling with linear backoff.
//!
//! Used for asynchronous external jobs (speech synthesis) and for walking a
//! bounded list of candidates (music selection).

use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use sclip_models::AsyncJobHandle;

use crate::error::{WorkerError, WorkerResult};

/// Configuration for polling behavior.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, before the increment.
    pub initial_delay: Duration,
    /// Added to the delay for every failed attempt.
    pub backoff_increment: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(1000),
            backoff_increment: Duration::from_millis(1000),
            operation_name: "operation".to_string(),
        }
    }
}

impl PollConfig {
    /// Create a new poll config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff_increment(mut self, increment: Duration) -> Self {
        self.backoff_increment = increment;
        self
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_add(self.backoff_increment.saturating_mul(attempt))
    }
}

/// Outcome of one polling attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPoll<T> {
    /// Not done yet; counts as a failed attempt.
    Pending,
    Succeeded(T),
    /// Terminal failure reported by the job itself.
    Failed(String),
}

/// Poll `attempt_fn` until it succeeds, fails terminally or the attempt
/// budget runs out.
///
/// `attempt_fn` receives the 0-based attempt index. `Pending` and `Err`
/// both count as failed attempts. No delay follows the last attempt.
pub async fn poll_until<F, Fut, T, E>(config: &PollConfig, mut attempt_fn: F) -> WorkerResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<JobPoll<T>, E>>,
    E: Display,
{
    let mut last_error = String::from("no attempt made");

    for attempt in 0..config.max_attempts {
        match attempt_fn(attempt).await {
            Ok(JobPoll::Succeeded(value)) => {
                debug!(
                    "{} succeeded on attempt {}",
                    config.operation_name,
                    attempt + 1
                );
                return Ok(value);
            }
            Ok(JobPoll::Failed(reason)) => {
                warn!("{} failed terminally: {}", config.operation_name, reason);
                return Err(WorkerError::JobFailed(reason));
            }
            Ok(JobPoll::Pending) => last_error = "still pending".to_string(),
            Err(e) => last_error = e.to_string(),
        }

        let failed = attempt + 1;
        if failed < config.max_attempts {
            let delay = config.delay_after_attempt(failed);
            debug!(
                "{} attempt {} failed, polling again in {:?}: {}",
                config.operation_name, failed, delay, last_error
            );
            tokio::time::sleep(delay).await;
        }
    }

    warn!(
        "{} gave up after {} attempts: {}",
        config.operation_name, config.max_attempts, last_error
    );
    Err(WorkerError::MaxRetriesExceeded {
        operation: config.operation_name.clone(),
        attempts: config.max_attempts,
        last_error,
    })
}

/// Status endpoint of an asynchronous external job.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    type Output: Send;

    async fn poll_status(&self, handle: &AsyncJobHandle) -> WorkerResult<JobPoll<Self::Output>>;
}

/// Poll `source` for `handle` until the job settles.
pub async fn poll_job<S>(
    source: &S,
    handle: &AsyncJobHandle,
    config: &PollConfig,
) -> WorkerResult<S::Output>
where
    S: JobStatusSource + ?Sized,
{
    poll_until(config, |_| source.poll_status(handle)).await
}
