use rand::Rng;
use std::time::Duration;
use thiserror::Error;

/// Outcome classification for one vendor call attempt.
///
/// The retry predicate is a pure function of this tag, never of error
/// source chains or downcasting.
#[derive(Debug, Error)]
pub enum CallError {
    /// Connect/read failure before a status line arrived.
    #[error("transport: {0}")]
    Transport(String),

    /// HTTP status from the vendor.
    #[error("status {code}: {message}")]
    Status { code: u16, message: String },

    /// The vendor answered but the payload is unusable (zero valid items,
    /// job reported `error`, malformed JSON). Retrying cannot fix it.
    #[error("{0}")]
    Fatal(String),
}

impl CallError {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                code: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Transient transport failures and {429, 500, 502, 503, 504} retry;
    /// everything else does not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { code, .. } => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Fatal(_) => false,
        }
    }
}

/// Exponential backoff schedule: `base × 2^attempt`, ±20% jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay before the attempt after `completed_attempts` (0-based).
    pub fn backoff(&self, completed_attempts: u32) -> Duration {
        let exp = completed_attempts.min(16);
        let base_ms = self.base_backoff.as_millis() as u64;
        let scaled = base_ms.saturating_mul(1 << exp);
        let jitter = rand::rng().random_range(0.8..=1.2);
        Duration::from_millis((scaled as f64 * jitter) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_server_statuses_retry() {
        assert!(CallError::Transport("reset".into()).is_retryable());
        for code in [429, 500, 502, 503, 504] {
            assert!(CallError::status(code, "x").is_retryable(), "{code}");
        }
    }

    #[test]
    fn client_errors_do_not_retry() {
        for code in [400, 401, 403, 404, 409, 422] {
            assert!(!CallError::status(code, "x").is_retryable(), "{code}");
        }
        assert!(!CallError::Fatal("bad payload".into()).is_retryable());
    }

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        for (attempt, nominal_ms) in [(0u32, 1000u64), (1, 2000), (2, 4000)] {
            let delay = policy.backoff(attempt).as_millis() as u64;
            let low = nominal_ms * 8 / 10;
            let high = nominal_ms * 12 / 10;
            assert!(
                (low..=high).contains(&delay),
                "attempt {attempt}: {delay}ms outside [{low}, {high}]"
            );
        }
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(10)).max_attempts, 1);
    }
}
