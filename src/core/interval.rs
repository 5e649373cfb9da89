//! Leitner interval and mastery math.
//!
//! Box levels run from 1 (novice) to 5 (mastered). Each level maps to a fixed
//! review interval; the helpers here are pure and never fail. Out-of-range
//! levels fall back to the level-1 interval and clamp their mastery.

use crate::util::time::now_ms;

/// Lowest box level a tracked skill can hold.
pub const MIN_BOX_LEVEL: u8 = 1;

/// Highest box level; skills here are considered mastered.
pub const MAX_BOX_LEVEL: u8 = 5;

/// Mastery percentage gained per box level above 1.
pub const MASTERY_STEP: u32 = 25;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Review interval in days, indexed by box level. Index 0 is unused.
pub const INTERVAL_DAYS: [i64; 6] = [0, 1, 3, 7, 14, 30];

/// Clamp an arbitrary level into `[MIN_BOX_LEVEL, MAX_BOX_LEVEL]`.
#[must_use]
pub fn clamp_box_level(box_level: u8) -> u8 {
    box_level.clamp(MIN_BOX_LEVEL, MAX_BOX_LEVEL)
}

/// Review interval in days for a box level.
///
/// Levels outside the table use the level-1 interval.
#[must_use]
pub fn interval_days(box_level: u8) -> i64 {
    if (MIN_BOX_LEVEL..=MAX_BOX_LEVEL).contains(&box_level) {
        INTERVAL_DAYS[usize::from(box_level)]
    } else {
        INTERVAL_DAYS[usize::from(MIN_BOX_LEVEL)]
    }
}

/// Mastery percentage for a box level: 0, 25, 50, 75, 100 for levels 1..=5.
#[must_use]
pub fn calculate_mastery(box_level: u8) -> u8 {
    let steps = u32::from(box_level.max(MIN_BOX_LEVEL) - 1);
    let percent = (steps * MASTERY_STEP).min(100);
    // Bounded by the min above.
    u8::try_from(percent).unwrap_or(100)
}

/// Next review timestamp for a skill at `box_level`, measured from `now_ms`.
#[must_use]
pub fn calculate_next_review_at(box_level: u8, now_ms: i64) -> i64 {
    now_ms + interval_days(box_level) * DAY_MS
}

/// Next review timestamp for a skill at `box_level`, measured from now.
#[must_use]
pub fn calculate_next_review(box_level: u8) -> i64 {
    calculate_next_review_at(box_level, now_ms())
}

/// Whether a box level counts as mastered.
#[must_use]
pub const fn is_elite(box_level: u8) -> bool {
    box_level >= MAX_BOX_LEVEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastery_table_is_exact() {
        let got: Vec<u8> = (1..=5).map(calculate_mastery).collect();
        assert_eq!(got, vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn mastery_is_monotonic() {
        for level in 1..5 {
            assert!(calculate_mastery(level) <= calculate_mastery(level + 1));
        }
    }

    #[test]
    fn mastery_clamps_out_of_range() {
        assert_eq!(calculate_mastery(0), 0);
        assert_eq!(calculate_mastery(6), 100);
        assert_eq!(calculate_mastery(99), 100);
        assert_eq!(calculate_mastery(u8::MAX), 100);
    }

    #[test]
    fn interval_table() {
        let got: Vec<i64> = (1..=5).map(interval_days).collect();
        assert_eq!(got, vec![1, 3, 7, 14, 30]);
    }

    #[test]
    fn out_of_range_levels_use_one_day() {
        let now = 1_700_000_000_000;
        for level in [0, 6, 99] {
            assert_eq!(calculate_next_review_at(level, now), now + DAY_MS);
        }
    }

    #[test]
    fn next_review_is_in_the_future() {
        let before = now_ms();
        assert!(calculate_next_review(1) >= before + DAY_MS);
    }

    #[test]
    fn elite_threshold() {
        assert!(!is_elite(4));
        assert!(is_elite(5));
        assert!(is_elite(7));
    }

    #[test]
    fn clamp_levels() {
        assert_eq!(clamp_box_level(0), 1);
        assert_eq!(clamp_box_level(3), 3);
        assert_eq!(clamp_box_level(42), 5);
    }
}
