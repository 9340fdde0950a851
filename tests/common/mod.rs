//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use dirvis_rs::network::AlgorithmData;
use std::time::{Duration, Instant};

/// Upper bound for anything that waits on a background thread
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Unwrap a `u64` payload
pub fn value(data: Option<AlgorithmData>) -> Option<u64> {
    data.and_then(|d| d.downcast_ref::<u64>().copied())
}
