//! Retry policy for transient network failures.
//!
//! The [`GraphqlClient`](crate::clients::GraphqlClient) only ever retries
//! transient network failures. Non-2xx statuses, undecodable bodies and
//! GraphQL errors come from a reachable server and are returned as-is. This
//! module decides *whether* and *when* the next attempt happens.

use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;

/// Retry decision result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after a delay.
    RetryAfter(Duration),
    /// Do not retry.
    DoNotRetry,
}

/// Bounded retry with exponential backoff and jitter.
///
/// `max_attempts` counts the initial attempt, so `Some(1)` disables retries
/// and `None` retries forever (until the call is cancelled or its deadline
/// passes).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gql_transport::clients::{RetryDecision, RetryPolicy};
///
/// let policy = RetryPolicy::default()
///     .with_max_attempts(Some(4))
///     .with_jitter(Duration::ZERO);
///
/// assert_eq!(
///     policy.decide(1),
///     RetryDecision::RetryAfter(Duration::from_millis(100))
/// );
/// assert_eq!(
///     policy.decide(2),
///     RetryDecision::RetryAfter(Duration::from_millis(200))
/// );
/// assert_eq!(policy.decide(4), RetryDecision::DoNotRetry);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: Option<u32>,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum jitter to add to delays.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(Some(1))
    }

    /// A policy that retries transient failures until the call is cancelled.
    ///
    /// Backoff still applies between attempts.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default().with_max_attempts(None)
    }

    /// A policy with no delay between attempts.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Sets the attempt bound.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the base and maximum backoff delay.
    #[must_use]
    pub const fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Sets the maximum jitter.
    #[must_use]
    pub const fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Checks that the policy can make at least one attempt and that the
    /// backoff bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPolicy`] when `max_attempts` is
    /// `Some(0)` or `base_delay` exceeds `max_delay`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == Some(0) {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigError::InvalidRetryPolicy {
                reason: format!(
                    "base_delay ({:?}) exceeds max_delay ({:?})",
                    self.base_delay, self.max_delay
                ),
            });
        }
        Ok(())
    }

    /// Decide whether to make another attempt after `attempt` attempts have
    /// failed with a transient error.
    #[must_use]
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if let Some(max_attempts) = self.max_attempts {
            if attempt >= max_attempts {
                return RetryDecision::DoNotRetry;
            }
        }

        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let exp = 2_u64.saturating_pow(attempt.saturating_sub(1));
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let delay_ms = base_ms.saturating_mul(exp).min(max_ms);

        let jitter_ms = if self.max_jitter.is_zero() {
            0
        } else {
            let jitter_max = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
            rand::thread_rng().gen_range(0..=jitter_max)
        };

        RetryDecision::RetryAfter(Duration::from_millis(delay_ms.saturating_add(jitter_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_bounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, Some(3));
        assert!(matches!(policy.decide(1), RetryDecision::RetryAfter(_)));
        assert!(matches!(policy.decide(2), RetryDecision::RetryAfter(_)));
        assert_eq!(policy.decide(3), RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_no_retry_stops_after_first_attempt() {
        assert_eq!(RetryPolicy::no_retry().decide(1), RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_unbounded_policy_never_gives_up() {
        let policy = RetryPolicy::unbounded();
        assert!(matches!(policy.decide(1_000), RetryDecision::RetryAfter(_)));
    }

    #[test]
    fn test_backoff_doubles_and_caps_at_max_delay() {
        let policy = RetryPolicy::unbounded()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(350))
            .with_jitter(Duration::ZERO);

        assert_eq!(
            policy.decide(1),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(2),
            RetryDecision::RetryAfter(Duration::from_millis(200))
        );
        assert_eq!(
            policy.decide(3),
            RetryDecision::RetryAfter(Duration::from_millis(350))
        );
        assert_eq!(
            policy.decide(60),
            RetryDecision::RetryAfter(Duration::from_millis(350))
        );
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy::immediate(10).with_jitter(Duration::from_millis(20));
        for attempt in 1..10 {
            match policy.decide(attempt) {
                RetryDecision::RetryAfter(delay) => {
                    assert!(delay <= Duration::from_millis(20));
                }
                RetryDecision::DoNotRetry => panic!("expected a retry"),
            }
        }
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let policy = RetryPolicy::default().with_max_attempts(Some(0));
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::InvalidRetryPolicy { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let policy = RetryPolicy::default()
            .with_backoff(Duration::from_secs(10), Duration::from_secs(1));
        assert!(policy.validate().is_err());
        assert!(RetryPolicy::default().validate().is_ok());
    }
}
