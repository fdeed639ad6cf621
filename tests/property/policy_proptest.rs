//! Property-based tests for reconnect policies

use std::time::Duration;
use chatty::backend::storage::{ExponentialBackoff, ReconnectPolicy};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_backoff_bounded_and_monotonic(
        initial_ms in 1u64..1_000,
        max_ms in 1u64..60_000,
        attempt in 1u32..200,
    ) {
        let policy = ExponentialBackoff {
            initial: Duration::from_millis(initial_ms),
            max: Duration::from_millis(max_ms),
            max_attempts: None,
        };
        let current = policy.next_delay(attempt).unwrap();
        let next = policy.next_delay(attempt + 1).unwrap();

        prop_assert!(current <= policy.max);
        prop_assert!(current <= next);
    }

    #[test]
    fn test_backoff_stops_after_cap(cap in 1u32..50, extra in 1u32..50) {
        let policy = ExponentialBackoff {
            max_attempts: Some(cap),
            ..ExponentialBackoff::default()
        };
        prop_assert!(policy.next_delay(cap).is_some());
        prop_assert!(policy.next_delay(cap + extra).is_none());
    }
}
