//! Half-cycle time newtype.

use std::ops::{Add, AddAssign, Sub};

/// A duration measured in half-cycles of the processor clock.
///
/// Two half-cycles make one clock cycle. Bus steps on the 68000 are 3, 4, 5
/// or 9 half-cycles long, so whole cycles are too coarse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HalfCycles(pub u64);

impl HalfCycles {
    /// Zero half-cycles.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(half_cycles: u64) -> Self {
        Self(half_cycles)
    }

    /// A duration of whole clock cycles.
    #[must_use]
    pub const fn from_cycles(cycles: u64) -> Self {
        Self(cycles * 2)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whole clock cycles, rounding down.
    #[must_use]
    pub const fn cycles(self) -> u64 {
        self.0 / 2
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for HalfCycles {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for HalfCycles {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for HalfCycles {
    type Output = Self;

    /// Saturates at zero.
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl From<u64> for HalfCycles {
    fn from(half_cycles: u64) -> Self {
        Self(half_cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_round_down() {
        assert_eq!(HalfCycles::new(9).cycles(), 4);
        assert_eq!(HalfCycles::from_cycles(4).get(), 8);
    }

    #[test]
    fn subtraction_saturates() {
        assert_eq!(HalfCycles::new(3) - HalfCycles::new(5), HalfCycles::ZERO);
    }
}
