//! Round timing. Stateless: everything is derived from the persisted
//! millisecond timestamps of a duel and the caller's `now`.

use chrono::DateTime;

use crate::Duel;

/// Round window when the creator does not pick one
pub const DEFAULT_ROUND_SECONDS: u32 = 15;

/// Shortest allowed round window
pub const MIN_ROUND_SECONDS: u32 = 5;

/// Longest allowed round window
pub const MAX_ROUND_SECONDS: u32 = 60;

/// Requested seconds per round -> window length in ms, clamped to 5..=60 s
pub fn round_duration_ms(round_seconds: Option<u32>) -> u32 {
    round_seconds
        .unwrap_or(DEFAULT_ROUND_SECONDS)
        .clamp(MIN_ROUND_SECONDS, MAX_ROUND_SECONDS)
        * 1_000
}

/// (start, end) of a round opened at `now`
pub fn round_window(now: i64, duration_ms: u32) -> (i64, i64) {
    (now, now + duration_ms as i64)
}

/// A round is over once `now` is strictly past its end.
/// A duel without a deadline has not expired.
pub fn is_expired(duel: &Duel, now: i64) -> bool {
    duel.round_ends_at_ms.map_or(false, |ends| now > ends)
}

/// Time left in the current round, 0 once expired or when no deadline is set
pub fn remaining_ms(duel: &Duel, now: i64) -> i64 {
    duel.round_ends_at_ms.map_or(0, |ends| (ends - now).max(0))
}

/// Render a timestamp for log lines ("14:03:07.250Z")
pub fn fmt_ms(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(at) => at.format("%H:%M:%S%.3fZ").to_string(),
        None => ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::duel_fixture;

    #[test]
    fn test_round_duration_defaults_and_clamps() {
        assert_eq!(round_duration_ms(None), 15_000);
        assert_eq!(round_duration_ms(Some(30)), 30_000);
        assert_eq!(round_duration_ms(Some(1)), 5_000);
        assert_eq!(round_duration_ms(Some(0)), 5_000);
        assert_eq!(round_duration_ms(Some(600)), 60_000);
    }

    #[test]
    fn test_expiry_is_strict() {
        let mut duel = duel_fixture();
        duel.round_ends_at_ms = Some(10_000);

        assert!(!is_expired(&duel, 9_999));
        assert!(!is_expired(&duel, 10_000)); // still live exactly at the deadline
        assert!(is_expired(&duel, 10_001));

        assert_eq!(remaining_ms(&duel, 4_000), 6_000);
        assert_eq!(remaining_ms(&duel, 12_000), 0);
    }

    #[test]
    fn test_no_deadline_never_expires() {
        let duel = duel_fixture();
        assert!(!is_expired(&duel, i64::MAX));
        assert_eq!(remaining_ms(&duel, 0), 0);
    }

    #[test]
    fn test_fmt_ms() {
        assert_eq!(fmt_ms(0), "00:00:00.000Z");
        assert_eq!(fmt_ms(1_250), "00:00:01.250Z");
    }
}
