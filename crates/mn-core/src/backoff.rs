//! Connection retry policy with a fixed backoff schedule.
//!
//! Unlike a multiplicative backoff, the schedule here is an explicit table:
//! the socket servers we talk to are system daemons that either come up
//! within a few minutes of boot or not at all, so the delays are fixed and
//! deterministic (no jitter) and the budget is bounded at five attempts.

use std::time::Duration;

/// Number of connect attempts allowed before giving up.
pub const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Production backoff schedule: 5s, 10s, 30s, 1min, 5min.
const DEFAULT_SCHEDULE: [Duration; MAX_CONNECT_ATTEMPTS as usize] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(300),
];

/// Maps a retry attempt count to a wait duration and a give-up decision.
///
/// Pure and deterministic: the same attempt number always yields the same
/// delay, which keeps worker behavior reproducible in tests. The schedule
/// can be replaced wholesale (tests use millisecond delays), but the
/// five-attempt budget is fixed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    schedule: [Duration; MAX_CONNECT_ATTEMPTS as usize],
}

impl RetryPolicy {
    /// Creates a policy with a custom schedule.
    ///
    /// The slot at index `i` is the delay after attempt `i + 1` fails.
    pub fn with_schedule(schedule: [Duration; MAX_CONNECT_ATTEMPTS as usize]) -> Self {
        Self { schedule }
    }

    /// Returns the delay to sleep after the given failed attempt (1-based).
    ///
    /// Attempts past the end of the schedule clamp to the last slot; callers
    /// are expected to consult [`should_give_up`](Self::should_give_up)
    /// first.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1).min(MAX_CONNECT_ATTEMPTS - 1) as usize;
        self.schedule.get(idx).copied().unwrap_or(Duration::ZERO)
    }

    /// Returns true once the attempt count has exhausted the budget.
    pub fn should_give_up(&self, attempt: u32) -> bool {
        attempt > MAX_CONNECT_ATTEMPTS
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_schedule(DEFAULT_SCHEDULE)
    }
}
