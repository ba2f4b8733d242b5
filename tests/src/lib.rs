//! Shared test support: mock sink, event fixtures, polling helper.

pub mod fixtures;

use std::time::{Duration, Instant};

/// Polls `cond` until it holds, panicking after five seconds.
pub async fn eventually(cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            Instant::now() < deadline,
            "condition not met within 5 seconds"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
