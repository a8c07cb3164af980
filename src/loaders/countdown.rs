//! Countdown over a pending redemption's expiry instant.
//!
//! This view is presentation-only: reaching zero here writes nothing. The
//! durable expired transition is always a store write, made by the sweep.

use std::time::{Duration, Instant, SystemTime};

use failure::Error as FailureError;
use futures::{future, Stream};
use tokio::timer::Interval;

/// Remaining whole seconds until `expires_at`, rounded up so a still-valid
/// window never displays zero.
pub fn remaining_seconds(expires_at: SystemTime, now: SystemTime) -> u64 {
    match expires_at.duration_since(now) {
        Ok(remaining) => {
            let seconds = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                seconds + 1
            } else {
                seconds
            }
        }
        Err(_) => 0,
    }
}

/// Once-per-second ticks of the remaining validity window. Ends after
/// emitting zero. Dropping the stream cancels the timer and nothing else.
pub fn countdown(expires_at: SystemTime) -> impl Stream<Item = u64, Error = FailureError> {
    let mut emitted_zero = false;
    Interval::new(Instant::now(), Duration::from_secs(1))
        .map_err(FailureError::from)
        .map(move |_| remaining_seconds(expires_at, SystemTime::now()))
        .take_while(move |&remaining| {
            let keep_going = !emitted_zero;
            emitted_zero = remaining == 0;
            future::ok(keep_going)
        })
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    fn at(unix_seconds: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(unix_seconds)
    }

    #[test]
    fn test_remaining_full_window() {
        let now = at(1_000_000);
        assert_eq!(remaining_seconds(now + Duration::from_secs(60), now), 60);
    }

    #[test]
    fn test_remaining_rounds_partial_seconds_up() {
        let now = at(1_000_000);
        assert_eq!(remaining_seconds(now + Duration::from_millis(500), now), 1);
        assert_eq!(remaining_seconds(now + Duration::from_millis(59_400), now), 60);
    }

    #[test]
    fn test_remaining_zero_at_expiry() {
        let now = at(1_000_000);
        assert_eq!(remaining_seconds(now, now), 0);
    }

    #[test]
    fn test_remaining_zero_after_expiry() {
        let now = at(1_000_000);
        assert_eq!(remaining_seconds(now - Duration::from_secs(10), now), 0);
    }
}
