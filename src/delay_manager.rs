use std::time::Duration;
use std::thread;
use log::{debug, info};

/// Pause between two successful page fetches.
pub fn page_delay(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    debug!("Waiting for {:?} (Page Delay)...", delay);
    thread::sleep(delay);
}

/// Linear backoff: `step` after the first failed attempt, `2 * step` after the second, and so on.
pub fn backoff(step: Duration, attempt: u32) -> Duration {
    step.saturating_mul(attempt)
}

pub fn retry_delay(step: Duration, attempt: u32) {
    let delay = backoff(step, attempt);
    if delay.is_zero() {
        return;
    }
    info!("Waiting for {:?} before retrying (Retry Delay)...", delay);
    thread::sleep(delay);
}
