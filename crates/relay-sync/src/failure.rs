//! Failure policy for target writes.
//!
//! A write that fails is retried according to [`RetryPolicy`], then handed to
//! a [`FailureSink`] and dropped. The event still counts as processed and its
//! offset is still committed, so one poison row never stalls the stream.

use relay_core::{ChangeOp, RecordKey};
use std::time::Duration;
use tracing::error;

/// How many times a write is attempted before it is given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below 1.
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// A single attempt: failures are logged and swallowed straight away.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// A write that was given up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub op: ChangeOp,
    pub key: Option<RecordKey>,
    pub attempts: u32,
    /// Rendered error chain of the last attempt
    pub error: String,
}

impl std::fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = self
            .key
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "NULL".to_string());
        write!(
            f,
            "{} of id {key} failed after {} attempt(s): {}",
            self.op, self.attempts, self.error
        )
    }
}

/// Where given-up writes go.
///
/// The default [`LogFailures`] only logs. A deployment that wants a
/// dead-letter topic or a failure table plugs in its own implementation.
pub trait FailureSink: Send + Sync {
    fn on_failure(&self, failure: &ApplyFailure);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailures;

impl FailureSink for LogFailures {
    fn on_failure(&self, failure: &ApplyFailure) {
        error!("Error applying change to target: {failure}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_never_below_one_attempt() {
        assert_eq!(RetryPolicy::fixed(0, Duration::from_millis(5)).max_attempts, 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::none());
    }

    #[test]
    fn test_failure_display() {
        let failure = ApplyFailure {
            op: ChangeOp::Update,
            key: Some(RecordKey::Int(4)),
            attempts: 3,
            error: "connection reset".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "UPDATE of id 4 failed after 3 attempt(s): connection reset"
        );

        let failure = ApplyFailure {
            key: None,
            attempts: 1,
            ..failure
        };
        assert!(failure.to_string().starts_with("UPDATE of id NULL"));
    }
}
