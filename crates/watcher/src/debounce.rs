//! Escalating debounce delay
//!
//! A single save in an editor often lands as several writes. Each write in a
//! burst pushes the rebuild further out: the n-th write of a burst waits
//! `n * base_delay`. Only the last scheduled wait of a burst survives, so the
//! rebuild happens once the writes settle.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    base_delay: Duration,
}

impl DebouncePolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait before rebuilding after the `burst`-th change of a burst
    pub fn delay_for(&self, burst: u32) -> Duration {
        self.base_delay.saturating_mul(burst.max(1))
    }
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self::new(sitetree_core::config::DEFAULT_BASE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_escalates_with_burst() {
        let policy = DebouncePolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(600));
    }

    #[test]
    fn test_zero_burst_waits_one_unit() {
        let policy = DebouncePolicy::new(Duration::from_millis(50));
        assert_eq!(policy.delay_for(0), Duration::from_millis(50));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = DebouncePolicy::new(Duration::MAX);
        assert_eq!(policy.delay_for(2), Duration::MAX);
    }
}
