//! Test fixtures shared by unit tests.

use std::time::Duration;
use tokio::time::Instant;

/// Assert that `start` lies `expected_ms` in the past, allowing 10ms of
/// scheduler slack in paused time.
pub fn assert_elapsed(start: Instant, expected_ms: u64) {
    let elapsed = start.elapsed();
    let expected = Duration::from_millis(expected_ms);
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(10),
        "expected ~{:?}, got {:?}",
        expected,
        elapsed
    );
}
