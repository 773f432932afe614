//! Tick counter.

use serde::Serialize;

/// A count of micro-op ticks.
///
/// One tick is one bus transaction or one internal operation. The CPU
/// counts every tick it completes; failed ticks are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Ticks(u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The tick after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::fmt::Display for Ticks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting() {
        let mut t = Ticks::ZERO.next().next();
        assert_eq!(t.get(), 2);
        t += Ticks::new(3);
        assert_eq!(t, Ticks::new(5));
        assert_eq!((t + Ticks::new(1)).to_string(), "6");
    }

    #[test]
    fn serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&Ticks::new(42)).ok().as_deref(), Some("42"));
    }
}
