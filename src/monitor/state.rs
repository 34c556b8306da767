//! Accessibility state machine.
//!
//! Probe outcomes are noisy; these pure functions turn them into a debounced
//! up/down signal and the delay until the next probe. Keeping them free of
//! locks and I/O makes the transition table directly testable.
//!
//! ```text
//! Down ──[1 success]──────────────────────> Up
//! Up ──[failures exceed retries]──────────> Down
//! Up ──[failure while network reported
//!        locally unavailable]─────────────> Down (short-circuit)
//! ```

use std::time::Duration;

/// Result of applying one probe outcome to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    /// Accessibility after the outcome.
    pub accessible: bool,
    /// Consecutive-failure tally after the outcome.
    pub failure_count: u32,
    /// Whether the accessibility flag flipped (subscribers get notified).
    pub changed: bool,
}

/// Apply one probe outcome to the current state.
///
/// A failure increments the tally and flips an accessible endpoint down only
/// once the tally exceeds `retries`, or immediately when the local network is
/// reported unavailable (the remote endpoint cannot be better off than our
/// own link). A success zeroes the tally and flips an inaccessible endpoint
/// up with no debounce.
pub(crate) fn apply_outcome(
    accessible: bool,
    failure_count: u32,
    retries: u32,
    success: bool,
    network_available: bool,
) -> Transition {
    if success {
        Transition {
            accessible: true,
            failure_count: 0,
            changed: !accessible,
        }
    } else {
        let failure_count = failure_count.saturating_add(1);
        let lost = accessible && (failure_count > retries || !network_available);
        Transition {
            accessible: accessible && !lost,
            failure_count,
            changed: lost,
        }
    }
}

/// Delay before the next probe, computed purely from current state.
///
/// While the endpoint is accessible and the failure tally is under the
/// threshold the next check fires with zero delay: if it failed once it will
/// probably fail again, so confirm fast. Everything else waits the steady
/// interval.
pub(crate) fn next_delay(
    accessible: bool,
    failure_count: u32,
    retries: u32,
    interval: Duration,
) -> Duration {
    if accessible && failure_count < retries {
        Duration::ZERO
    } else {
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETRIES: u32 = 3;

    #[test]
    fn test_down_failure_stays_down_without_notify() {
        let t = apply_outcome(false, 5, RETRIES, false, true);
        assert_eq!(
            t,
            Transition {
                accessible: false,
                failure_count: 6,
                changed: false
            }
        );
    }

    #[test]
    fn test_down_success_flips_up_and_notifies() {
        let t = apply_outcome(false, 7, RETRIES, true, true);
        assert_eq!(
            t,
            Transition {
                accessible: true,
                failure_count: 0,
                changed: true
            }
        );
    }

    #[test]
    fn test_up_failure_under_threshold_stays_up() {
        // One isolated failure never flips an up endpoint down.
        let t = apply_outcome(true, 0, RETRIES, false, true);
        assert_eq!(
            t,
            Transition {
                accessible: true,
                failure_count: 1,
                changed: false
            }
        );
    }

    #[test]
    fn test_up_failure_at_threshold_boundary() {
        // retries consecutive failures alone must NOT flip the flag...
        let t = apply_outcome(true, RETRIES - 1, RETRIES, false, true);
        assert!(t.accessible);
        assert_eq!(t.failure_count, RETRIES);
        assert!(!t.changed);

        // ...the (retries + 1)-th failure is what trips it.
        let t = apply_outcome(true, RETRIES, RETRIES, false, true);
        assert!(!t.accessible);
        assert_eq!(t.failure_count, RETRIES + 1);
        assert!(t.changed);
    }

    #[test]
    fn test_up_success_stays_up_without_notify() {
        let t = apply_outcome(true, 2, RETRIES, true, true);
        assert_eq!(
            t,
            Transition {
                accessible: true,
                failure_count: 0,
                changed: false
            }
        );
    }

    #[test]
    fn test_network_unavailable_short_circuits_threshold() {
        // First failure, well under threshold, but the local link is gone.
        let t = apply_outcome(true, 0, RETRIES, false, false);
        assert!(!t.accessible);
        assert_eq!(t.failure_count, 1);
        assert!(t.changed);
    }

    #[test]
    fn test_network_unavailable_down_endpoint_no_notify() {
        let t = apply_outcome(false, 1, RETRIES, false, false);
        assert!(!t.accessible);
        assert!(!t.changed);
    }

    #[test]
    fn test_failure_count_saturates() {
        let t = apply_outcome(false, u32::MAX, RETRIES, false, true);
        assert_eq!(t.failure_count, u32::MAX);
    }

    #[test]
    fn test_scripted_sequence_retries_two() {
        // success, fail, fail, fail with retries = 2: still up after two
        // fails, down after the third.
        let retries = 2;
        let t = apply_outcome(true, 0, retries, true, true);
        assert!(t.accessible);

        let t = apply_outcome(t.accessible, t.failure_count, retries, false, true);
        assert!(t.accessible);
        let t = apply_outcome(t.accessible, t.failure_count, retries, false, true);
        assert!(t.accessible);
        let t = apply_outcome(t.accessible, t.failure_count, retries, false, true);
        assert!(!t.accessible);
        assert!(t.changed);
    }

    #[test]
    fn test_next_delay_fast_confirm_while_up() {
        // Healthy and under threshold: zero-delay fast confirm.
        assert_eq!(next_delay(true, 0, RETRIES, Duration::from_secs(30)), Duration::ZERO);
        assert_eq!(next_delay(true, 2, RETRIES, Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn test_next_delay_interval_otherwise() {
        let interval = Duration::from_secs(30);
        // Up but at threshold: back to the steady interval.
        assert_eq!(next_delay(true, RETRIES, RETRIES, interval), interval);
        // Down: steady interval regardless of tally.
        assert_eq!(next_delay(false, 0, RETRIES, interval), interval);
        assert_eq!(next_delay(false, 10, RETRIES, interval), interval);
    }
}
