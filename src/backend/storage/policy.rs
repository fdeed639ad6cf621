//! Reconnect policies for the storage supervisor.
//!
//! The default, `AlwaysRetry`, reconnects immediately and forever. That is
//! the historical behavior and it will spin against a database that stays
//! down; deployments that care should pick `ExponentialBackoff`.

use std::time::Duration;

/// Decides whether, and after how long, to try reconnecting again
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before reconnect attempt `attempt` (1-based, reset after every
    /// successful connection). `None` stops reconnecting.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Retry immediately, without limit
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl ReconnectPolicy for AlwaysRetry {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        Some(Duration::ZERO)
    }
}

/// Doubling delay with a ceiling and an optional attempt cap
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|cap| attempt > cap) {
            return None;
        }
        let exponent = attempt.max(1) - 1;
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        Some(self.initial.saturating_mul(factor).min(self.max))
    }
}
