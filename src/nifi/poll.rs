//! Bounded readiness polling for environment endpoints.

use crate::error::MigrationError;
use std::thread;
use std::time::{Duration, Instant};

/// Block until `probe` reports the endpoint up, retrying every `interval`
/// within a total budget of `max_wait`.
///
/// The probe is attempted once immediately, so a reachable endpoint never
/// waits. This is the only retry loop in the tool; failed API calls after
/// connectivity are never retried.
pub fn wait_until_ready(
    label: &str,
    url: &str,
    interval: Duration,
    max_wait: Duration,
    probe: impl Fn() -> bool,
) -> Result<(), MigrationError> {
    let start = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if probe() {
            tracing::info!(label, url, attempt, "endpoint is up");
            return Ok(());
        }
        if start.elapsed() + interval > max_wait {
            return Err(MigrationError::Timeout {
                label: label.to_string(),
                url: url.to_string(),
                waited_secs: start.elapsed().as_secs(),
            });
        }
        tracing::info!(label, url, attempt, "endpoint not reachable yet, retrying");
        thread::sleep(interval);
    }
}
