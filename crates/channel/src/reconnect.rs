//! Reconnect policy: fixed delay by default, with opt-in back-off.

use std::time::Duration;

use sa_domain::config::ChannelConfig;

/// Controls how the live channel reconnects after a connection drop.
///
/// The default waits a fixed 5 seconds before every attempt and never
/// gives up.  Setting `backoff_factor` above `1.0` grows the delay per
/// consecutive failure up to `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub delay: Duration,
    /// Maximum delay between attempts (cap).  Values below `delay` are
    /// ignored.
    pub max_delay: Duration,
    /// Multiplier applied after each failed attempt.
    pub backoff_factor: f64,
    /// Maximum number of consecutive failures before giving up.
    /// `0` means unlimited retries.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

impl ReconnectPolicy {
    /// Always wait `delay`, retry forever.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_delay: delay,
            backoff_factor: 1.0,
            max_attempts: 0,
        }
    }

    pub fn from_config(cfg: &ChannelConfig) -> Self {
        Self {
            delay: Duration::from_millis(cfg.reconnect_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            backoff_factor: cfg.backoff_factor,
            max_attempts: cfg.max_attempts,
        }
    }

    /// Compute the delay for the given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.delay.as_millis() as f64;
        let factor = self.backoff_factor.max(1.0);
        let delay_ms = base_ms * factor.powi(attempt.min(i32::MAX as u32) as i32);
        let cap_ms = self.max_delay.max(self.delay).as_millis() as f64;
        Duration::from_millis(delay_ms.min(cap_ms) as u64)
    }

    /// Whether the given attempt number exceeds the max.
    pub fn should_give_up(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_five_seconds() {
        let p = ReconnectPolicy::default();
        for attempt in [0, 1, 7, 1000] {
            assert_eq!(p.delay_for_attempt(attempt), Duration::from_secs(5));
        }
        assert!(!p.should_give_up(1_000_000));
    }

    #[test]
    fn backoff_grows_until_capped() {
        let p = ReconnectPolicy {
            delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_attempts: 0,
        };
        assert_eq!(p.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(p.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(p.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(p.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn cap_below_delay_is_ignored() {
        let p = ReconnectPolicy {
            delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(5),
            backoff_factor: 1.0,
            max_attempts: 0,
        };
        assert_eq!(p.delay_for_attempt(0), Duration::from_secs(10));
    }

    #[test]
    fn shrinking_factor_is_treated_as_fixed() {
        let p = ReconnectPolicy {
            backoff_factor: 0.1,
            ..ReconnectPolicy::fixed(Duration::from_millis(200))
        };
        assert_eq!(p.delay_for_attempt(4), Duration::from_millis(200));
    }

    #[test]
    fn should_give_up_when_limited() {
        let p = ReconnectPolicy {
            max_attempts: 5,
            ..Default::default()
        };
        assert!(!p.should_give_up(4));
        assert!(p.should_give_up(5));
        assert!(p.should_give_up(6));
    }

    #[test]
    fn from_config_copies_fields() {
        let cfg = ChannelConfig {
            reconnect_delay_ms: 250,
            max_delay_ms: 4000,
            backoff_factor: 1.5,
            max_attempts: 3,
            ..Default::default()
        };
        let p = ReconnectPolicy::from_config(&cfg);
        assert_eq!(p.delay, Duration::from_millis(250));
        assert_eq!(p.max_delay, Duration::from_millis(4000));
        assert_eq!(p.max_attempts, 3);
    }
}
