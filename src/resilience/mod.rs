//! Resilience layer wrapping each external vendor.
//!
//! Every target gets a retrier (bounded attempts, exponential backoff with
//! jitter), a process-global circuit breaker, and an in-flight gate sized
//! to the vendor quota. The gate is acquired before the retry loop so a
//! retrying call cannot multiply pressure on a struggling vendor.
//!
//! Polling loops for asynchronous jobs are deliberately NOT run through
//! [`ResilientTarget::run`]: a "still processing" poll is not a failure.
//! Polls carry their own deadline in the pipeline.

mod breaker;
mod retry;

pub use breaker::CircuitBreaker;
pub use retry::{CallError, RetryPolicy};

use crate::config::{ResilienceConfig, TargetPolicy};
use crate::error::{FailureKind, VendorError, VendorTarget};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

/// One [`ResilientTarget`] per external capability, built once at bootstrap
/// and passed as a dependency, which makes breakers process-global.
pub struct Shields {
    pub question_gen: ResilientTarget,
    pub tts: ResilientTarget,
    pub avatar: ResilientTarget,
    pub stt: ResilientTarget,
    pub feedback_gen: ResilientTarget,
}

impl Shields {
    pub fn new(config: &ResilienceConfig) -> Self {
        Self {
            question_gen: ResilientTarget::new(VendorTarget::QuestionGen, &config.question_gen),
            tts: ResilientTarget::new(VendorTarget::Tts, &config.tts),
            avatar: ResilientTarget::new(VendorTarget::Avatar, &config.avatar),
            stt: ResilientTarget::new(VendorTarget::Stt, &config.stt),
            feedback_gen: ResilientTarget::new(VendorTarget::FeedbackGen, &config.feedback_gen),
        }
    }
}

pub struct ResilientTarget {
    target: VendorTarget,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
    gate: Semaphore,
}

impl ResilientTarget {
    pub fn new(target: VendorTarget, policy: &TargetPolicy) -> Self {
        Self {
            target,
            policy: RetryPolicy::new(
                policy.max_attempts,
                Duration::from_millis(policy.base_backoff_ms),
            ),
            breaker: CircuitBreaker::new(
                policy.breaker_window,
                policy.breaker_failure_ratio,
                Duration::from_secs(policy.breaker_open_secs),
                policy.breaker_probes,
            ),
            gate: Semaphore::new(policy.max_in_flight.max(1)),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `op` under the gate, breaker, and retry budget.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, VendorError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let _permit = self
            .gate
            .acquire()
            .await
            .expect("vendor gate semaphore is never closed");

        let mut last_error = String::new();
        for attempt in 0..self.policy.max_attempts {
            if !self.breaker.try_acquire() {
                return Err(self.fail(FailureKind::Open, "circuit open"));
            }

            match op().await {
                Ok(value) => {
                    self.breaker.record_success();
                    if attempt > 0 {
                        tracing::info!(
                            target = self.target.as_str(),
                            attempt,
                            "vendor recovered after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    self.breaker.record_failure();
                    if !err.is_retryable() {
                        tracing::warn!(
                            target = self.target.as_str(),
                            error = %err,
                            "non-retryable vendor error"
                        );
                        return Err(self.fail(FailureKind::NonRetryable, err.to_string()));
                    }
                    tracing::warn!(
                        target = self.target.as_str(),
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "vendor call failed, retrying"
                    );
                    last_error = err.to_string();
                    if attempt + 1 < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(self.fail(FailureKind::Exhausted, last_error))
    }

    fn fail(&self, kind: FailureKind, message: impl Into<String>) -> VendorError {
        VendorError {
            target: self.target,
            kind,
            message: message.into(),
        }
    }
}
