use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Fixed-interval retry limits for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Whether another request may follow the failures recorded so far
    pub fn allows_retry(&self, state: &RetryState) -> bool {
        state.failures < self.max_attempts
    }

    /// Block until the next attempt
    pub fn wait(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

/// Failed lookups so far; one per row, shared by all of that row's lookups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    failures: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(10));
    }

    #[test]
    fn test_allows_retry_until_cap() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut state = RetryState::new();

        state.record_failure();
        assert!(policy.allows_retry(&state));
        state.record_failure();
        assert!(policy.allows_retry(&state));
        state.record_failure();
        assert!(!policy.allows_retry(&state));
        assert_eq!(state.failures(), 3);
    }
}
