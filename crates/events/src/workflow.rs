//! Retriable workflow steps.
//!
//! A step is one unit of work that either succeeds, fails in a way that
//! retrying can fix ([`StepError::Retriable`]), or fails for good
//! ([`StepError::NonRetriable`]). [`run_step`] drives a step under a
//! [`RetryPolicy`] with exponential backoff between attempts. There is no
//! durable step log: a crashed process does not resume its steps.

use std::future::Future;
use std::time::Duration;

/// Default number of additional attempts after the first failure.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default delay before the first retry; doubles on each further retry.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the delay between attempts.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure classification for a single step attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// Retrying cannot change the outcome.
    #[error("non-retriable: {0}")]
    NonRetriable(String),

    /// Transient failure; the step may be attempted again.
    #[error("retriable: {0}")]
    Retriable(String),
}

impl StepError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, StepError::Retriable(_))
    }
}

/// Terminal failure of a step after all permitted attempts.
#[derive(Debug, Clone, thiserror::Error)]
#[error("step `{step}` failed after {attempts} attempt(s): {error}")]
pub struct StepFailure {
    pub step: String,
    pub attempts: u32,
    pub error: StepError,
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How often and how patiently a step is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Cap on the delay between attempts.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `retries` times without waiting in between.
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Total attempts a step may make, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

// ---------------------------------------------------------------------------
// run_step
// ---------------------------------------------------------------------------

/// Run `op` as the step named `step`, retrying retriable failures.
///
/// A [`StepError::NonRetriable`] ends the step immediately, whatever budget
/// remains. Every attempt is logged with the step name and attempt number.
pub async fn run_step<T, F, Fut>(
    step: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, StepFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StepError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::debug!(step, attempt, max_attempts, "Running step");

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(step, attempt, "Step succeeded after retry");
                } else {
                    tracing::debug!(step, "Step succeeded");
                }
                return Ok(value);
            }
            Err(error) if error.is_retriable() && attempt < max_attempts => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    step,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Step attempt failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(error) => {
                tracing::error!(step, attempt, error = %error, "Step failed");
                return Err(StepFailure {
                    step: step.to_string(),
                    attempts: attempt,
                    error,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
