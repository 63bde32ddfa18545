//! Rebate Levels

use std::fmt;

use thiserror::Error;

/// Lowest rebate level under consideration.
pub const MIN_LEVEL: u8 = 1;

/// Highest rebate level under consideration.
pub const MAX_LEVEL: u8 = 10;

/// Errors raised when constructing a rebate level.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// The level is outside the supported range.
    #[error("rebate level {0} is outside {min}..={max}", min = MIN_LEVEL, max = MAX_LEVEL)]
    OutOfRange(u8),
}

/// A rebate percentage increase under consideration, in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RebateLevel(u8);

impl RebateLevel {
    /// Create a rebate level.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::OutOfRange`] if `level` is outside `1..=10`.
    pub const fn new(level: u8) -> Result<Self, LevelError> {
        if level < MIN_LEVEL || level > MAX_LEVEL {
            return Err(LevelError::OutOfRange(level));
        }

        Ok(Self(level))
    }

    /// Percentage points offered.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every level in ascending order.
    pub fn all() -> impl Iterator<Item = RebateLevel> {
        (MIN_LEVEL..=MAX_LEVEL).map(RebateLevel)
    }

    /// Name of the indicator variable for this level (e.g. `r5`).
    pub fn variable_name(self) -> String {
        format!("r{}", self.0)
    }
}

impl TryFrom<u8> for RebateLevel {
    type Error = LevelError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl fmt::Display for RebateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
