//! Bounded retry schedule.

use loadrig_core::RetryConfig;
use std::time::Duration;

/// Exponential backoff with a hard attempt cap.
///
/// `delay_for(1)` is the pause after the first failed attempt; each later
/// pause doubles until `max_delay`. Unlike an unbounded retry-forever loop,
/// exhausting `max_attempts` is a hard failure the caller must surface.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Pause before attempt `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // shift capped well below u32 range; max_delay clamps long before
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 8,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(7), Duration::from_secs(5));
        assert_eq!(policy.delay_for(30), Duration::from_secs(5));
    }

    #[test]
    fn test_allows_up_to_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10));
        assert!(policy.allows(1));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig::default();
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
    }
}
