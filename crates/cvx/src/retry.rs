//! 🔄 Retry policy — exponential backoff as a value, not a vibe.
//!
//! The lazy version of this is a retry-forever loop with unbounded
//! exponential growth, which is how you end up with a process politely
//! waiting 4.7 hours to ask Postgres how it's doing. Here the policy is a
//! plain struct: delays are computable without a clock, the
//! growth is capped, and "forever" is an explicit `max_attempts: None`
//! instead of a `loop` with no exits and no regrets.

use std::time::Duration;

use crate::app_config::RuntimeConfig;

/// 🔄 Exponential backoff with a ceiling and an optional attempt budget.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// `None` = retry until the heat death of the universe (the default).
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub(crate) fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(runtime.backoff_initial_ms),
            max_delay: Duration::from_secs(runtime.backoff_max_secs),
            multiplier: runtime.backoff_multiplier,
            max_attempts: runtime.max_attempts,
        }
    }

    /// 🔍 May we go again after `attempt` failures?
    pub(crate) fn should_retry(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }

    /// ⏰ Delay before retry number `attempt + 1`. Attempt 1 waits the
    /// initial delay; each further attempt multiplies, up to the cap.
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        std::cmp::min(Duration::from_millis(millis as u64), self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts,
        }
    }

    #[test]
    fn the_one_where_delays_double_like_a_disappointed_parent_counting() {
        let p = policy(None);
        assert_eq!(p.delay(1), Duration::from_millis(100));
        assert_eq!(p.delay(2), Duration::from_millis(200));
        assert_eq!(p.delay(3), Duration::from_millis(400));
        assert_eq!(p.delay(4), Duration::from_millis(800));
    }

    #[test]
    fn the_one_where_the_ceiling_holds_no_matter_how_bad_it_gets() {
        let p = policy(None);
        // Attempt 30 would be ~14.8 hours unbounded. We are not doing that.
        assert_eq!(p.delay(30), Duration::from_secs(5));
        assert_eq!(p.delay(300), Duration::from_secs(5));
    }

    #[test]
    fn the_one_where_forever_means_forever() {
        let p = policy(None);
        assert!(p.should_retry(1));
        assert!(p.should_retry(1_000_000));
    }

    #[test]
    fn the_one_where_the_attempt_budget_actually_runs_out() {
        let p = policy(Some(3));
        assert!(p.should_retry(1));
        assert!(p.should_retry(2));
        assert!(!p.should_retry(3), "three strikes means three strikes");
    }
}
