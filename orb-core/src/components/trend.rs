//! Trend alignment: majority vote over recent directional moves.
//!
//! The live price is prepended to the `lookback - 1` most recent completed
//! closes and each adjacent pair votes bullish (newer > older), bearish
//! (newer < older) or abstains (equal). Flat stretches shrink the denominator,
//! so a few directional moves can carry the vote in a quiet market.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of prices in the vote, live price included.
    pub lookback: usize,
    /// Minimum agreeing fraction, in (0, 1].
    pub threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { lookback: 10, threshold: 0.6 }
    }
}

/// Vote tally over one lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendReading {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl TrendReading {
    fn directional(&self) -> usize {
        self.bullish + self.bearish
    }

    pub fn bullish_fraction(&self) -> f64 {
        self.bullish as f64 / self.directional() as f64
    }

    pub fn bearish_fraction(&self) -> f64 {
        self.bearish as f64 / self.directional() as f64
    }

    pub fn fraction(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long => self.bullish_fraction(),
            Direction::Short => self.bearish_fraction(),
        }
    }
}

/// Outcome of checking one direction against a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Aligned,
    NotAligned,
    /// No directional moves at all.
    InsufficientEvidence,
}

#[derive(Debug, Clone)]
pub struct TrendAligner {
    lookback: usize,
    threshold: f64,
}

impl TrendAligner {
    /// Out-of-range settings are clamped: lookback to at least 2, threshold
    /// into [0, 1] (non-finite reads as 1).
    pub fn new(config: &TrendConfig) -> Self {
        let threshold = if config.threshold.is_finite() { config.threshold.clamp(0.0, 1.0) } else { 1.0 };
        Self { lookback: config.lookback.max(2), threshold }
    }

    /// Completed closes the vote needs besides the live price.
    pub fn closes_needed(&self) -> usize {
        self.lookback - 1
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Tally moves over `live` followed by `closes` (newest first). Returns
    /// `None` when no pair is directional.
    pub fn measure(&self, live: f64, closes_newest_first: &[f64]) -> Option<TrendReading> {
        let series: Vec<f64> = std::iter::once(live)
            .chain(closes_newest_first.iter().copied().take(self.closes_needed()))
            .filter(|p| p.is_finite())
            .collect();

        let mut reading = TrendReading { bullish: 0, bearish: 0, neutral: 0 };
        for pair in series.windows(2) {
            if pair[0] > pair[1] {
                reading.bullish += 1;
            } else if pair[0] < pair[1] {
                reading.bearish += 1;
            } else {
                reading.neutral += 1;
            }
        }

        (reading.directional() > 0).then_some(reading)
    }

    pub fn alignment(&self, direction: Direction, reading: Option<&TrendReading>) -> Alignment {
        match reading {
            None => Alignment::InsufficientEvidence,
            Some(r) if r.fraction(direction) >= self.threshold => Alignment::Aligned,
            Some(_) => Alignment::NotAligned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligner(lookback: usize, threshold: f64) -> TrendAligner {
        TrendAligner::new(&TrendConfig { lookback, threshold })
    }

    #[test]
    fn ascending_series_is_fully_bullish() {
        let a = aligner(5, 0.6);
        // newest first: 104 > 103 > 102 > 101
        let reading = a.measure(105.0, &[104.0, 103.0, 102.0, 101.0, 100.0]).unwrap();
        assert_eq!(reading.bullish, 4);
        assert_eq!(reading.bullish_fraction(), 1.0);
        assert_eq!(reading.bearish_fraction(), 0.0);
        assert_eq!(a.alignment(Direction::Long, Some(&reading)), Alignment::Aligned);
        assert_eq!(a.alignment(Direction::Short, Some(&reading)), Alignment::NotAligned);
    }

    #[test]
    fn flat_series_is_insufficient() {
        let a = aligner(6, 0.6);
        assert!(a.measure(100.0, &[100.0; 10]).is_none());
        assert_eq!(a.alignment(Direction::Long, None), Alignment::InsufficientEvidence);
    }

    #[test]
    fn uses_only_lookback_minus_one_closes() {
        let a = aligner(3, 0.6);
        // live 101, closes 100, 99 -> two bullish; remaining closes ignored
        let reading = a.measure(101.0, &[100.0, 99.0, 200.0, 300.0]).unwrap();
        assert_eq!(reading.bullish, 2);
        assert_eq!(reading.bearish, 0);
    }

    #[test]
    fn neutral_moves_shrink_denominator() {
        let a = aligner(5, 0.6);
        // pairs: 101>100 bull, 100=100, 100=100, 100<101 bear
        let reading = a.measure(101.0, &[100.0, 100.0, 100.0, 101.0]).unwrap();
        assert_eq!(reading.neutral, 2);
        assert_eq!(reading.bullish_fraction(), 0.5);
    }

    #[test]
    fn threshold_is_inclusive() {
        let a = aligner(6, 0.6);
        // 3 bullish, 2 bearish
        let reading = a.measure(105.0, &[104.0, 103.0, 102.0, 103.0, 104.0]).unwrap();
        assert_eq!(reading.bullish_fraction(), 0.6);
        assert_eq!(a.alignment(Direction::Long, Some(&reading)), Alignment::Aligned);
    }

    #[test]
    fn non_finite_prices_are_dropped() {
        let a = aligner(4, 0.6);
        let reading = a.measure(102.0, &[f64::NAN, 101.0, 100.0]).unwrap();
        assert_eq!(reading.bullish, 2);
    }

    #[test]
    fn degenerate_settings_are_clamped() {
        let a = aligner(1, 0.6);
        assert_eq!(a.closes_needed(), 1);
        let reading = a.measure(101.0, &[100.0, 50.0]).unwrap();
        assert_eq!(reading.bullish, 1);

        assert_eq!(aligner(0, 0.6).closes_needed(), 1);
        assert_eq!(aligner(5, 1.5).threshold(), 1.0);
        assert_eq!(aligner(5, f64::NAN).threshold(), 1.0);
        assert_eq!(aligner(5, -0.2).threshold(), 0.0);
    }
}
