//! Mastery levels and the per-user level cap.
//!
//! A record climbs one level per correct answer and each level doubles the
//! review interval: level 1 is reviewed the next day, level 7 after 64 days.

use crate::error::{Result, SchedulerError};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 7;

/// Number of days between a review at `level` and the next one (2^(level-1)).
pub fn interval_days(level: u8) -> u64 {
    let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
    1u64 << (level - 1)
}

/// Per-user upper bound on the level a record can reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelCap(u8);

impl LevelCap {
    pub fn new(value: i64) -> Result<Self> {
        if (MIN_LEVEL as i64..=MAX_LEVEL as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(SchedulerError::InvalidLevelCap(value))
        }
    }

    /// Highest level a record of this user may hold.
    pub fn max_level(self) -> u8 {
        self.0.min(MAX_LEVEL)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for LevelCap {
    fn default() -> Self {
        Self(MAX_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_doubles_per_level() {
        let intervals: Vec<u64> = (1..=7).map(interval_days).collect();
        assert_eq!(intervals, vec![1, 2, 4, 8, 16, 32, 64]);
    }

    #[test]
    fn test_level_cap_bounds() {
        assert!(LevelCap::new(1).is_ok());
        assert!(LevelCap::new(7).is_ok());
        assert!(matches!(
            LevelCap::new(0),
            Err(SchedulerError::InvalidLevelCap(0))
        ));
        assert!(matches!(
            LevelCap::new(8),
            Err(SchedulerError::InvalidLevelCap(8))
        ));
    }

    #[test]
    fn test_default_cap_is_max_level() {
        assert_eq!(LevelCap::default().max_level(), MAX_LEVEL);
    }
}
