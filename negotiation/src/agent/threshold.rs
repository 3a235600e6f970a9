//! Acceptance threshold: the top share of its own ranking an agent accepts
//! without argument.

use serde::{Deserialize, Serialize};

/// Monotone, capped acceptance threshold in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceThreshold {
    percent: u32,
    increment: u32,
    widenings: u32,
}

impl AcceptanceThreshold {
    pub const MAX_PERCENT: u32 = 100;

    pub fn new(initial_percent: u32, increment_percent: u32) -> Self {
        Self {
            percent: initial_percent.min(Self::MAX_PERCENT),
            increment: increment_percent,
            widenings: 0,
        }
    }

    pub fn percent(&self) -> u32 {
        self.percent
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.percent) / 100.0
    }

    pub fn widenings(&self) -> u32 {
        self.widenings
    }

    pub fn is_full(&self) -> bool {
        self.percent >= Self::MAX_PERCENT
    }

    /// Widen by one increment, capped at 100%. Returns whether it moved.
    pub fn widen(&mut self) -> bool {
        let next = self
            .percent
            .saturating_add(self.increment)
            .min(Self::MAX_PERCENT);
        let moved = next != self.percent;
        self.percent = next;
        self.widenings += 1;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_is_monotone_and_capped() {
        let mut threshold = AcceptanceThreshold::new(10, 20);
        let mut last = threshold.percent();
        let mut steps = 0;
        while !threshold.is_full() {
            assert!(threshold.widen());
            assert!(threshold.percent() > last);
            last = threshold.percent();
            steps += 1;
        }
        assert_eq!(threshold.percent(), 100);
        assert_eq!(steps, 5);
        assert!(!threshold.widen());
        assert_eq!(threshold.percent(), 100);
        assert_eq!(threshold.widenings(), 6);
    }

    #[test]
    fn test_fraction() {
        assert!((AcceptanceThreshold::new(10, 20).fraction() - 0.1).abs() < f64::EPSILON);
        assert!((AcceptanceThreshold::new(250, 20).fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_increment_never_moves() {
        let mut threshold = AcceptanceThreshold::new(10, 0);
        assert!(!threshold.widen());
        assert_eq!(threshold.percent(), 10);
    }
}
