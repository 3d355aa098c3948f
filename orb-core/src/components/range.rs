//! Opening range: high/low band of the formation window.
//!
//! The range only ever widens while forming, and is frozen exactly once per
//! session at `range_end`. After freezing `size` never changes until `reset`.

use crate::domain::Bar;
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// High/low band. Starts at the `{-inf, +inf}` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
}

impl Default for OpeningRange {
    fn default() -> Self {
        Self::empty()
    }
}

impl OpeningRange {
    pub fn empty() -> Self {
        Self { high: f64::NEG_INFINITY, low: f64::INFINITY }
    }

    pub fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// At least one bar has been folded in.
    pub fn is_formed(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.high >= self.low
    }

    /// `high - low`, or 0 for an unformed range.
    pub fn size(&self) -> f64 {
        if self.is_formed() {
            self.high - self.low
        } else {
            0.0
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    pub fn upper_buffer(&self, buffer_fraction: f64) -> f64 {
        self.high + self.size() * buffer_fraction
    }

    pub fn lower_buffer(&self, buffer_fraction: f64) -> f64 {
        self.low - self.size() * buffer_fraction
    }

    fn widen(&mut self, high: f64, low: f64) {
        self.high = self.high.max(high);
        self.low = self.low.min(low);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    range: OpeningRange,
    frozen_size: Option<f64>,
    bars_seen: usize,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to sentinels for a new session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold one completed bar into the range. Ignored once frozen, and for
    /// void or malformed bars. Returns true if the bar was accepted.
    pub fn observe(&mut self, bar: &Bar) -> bool {
        if self.is_frozen() || !bar.is_sane() {
            return false;
        }
        self.range.widen(bar.high, bar.low);
        self.bars_seen += 1;
        true
    }

    /// Fold every bar whose open time falls inside the session's formation window.
    pub fn observe_window(&mut self, bars: &[Bar], session: &Session) -> usize {
        let mut accepted = 0;
        for bar in bars.iter().filter(|b| session.in_formation(b.time)) {
            if self.observe(bar) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Freeze the range. Returns `None` (and stays open) if no bar was seen.
    pub fn freeze(&mut self) -> Option<OpeningRange> {
        if self.is_frozen() {
            return Some(self.range);
        }
        if !self.range.is_formed() {
            return None;
        }
        self.frozen_size = Some(self.range.size());
        Some(self.range)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_size.is_some()
    }

    pub fn range(&self) -> OpeningRange {
        self.range
    }

    /// Frozen range, if any.
    pub fn frozen(&self) -> Option<OpeningRange> {
        self.frozen_size.map(|_| self.range)
    }

    /// Size captured at freeze time (0 before).
    pub fn size(&self) -> f64 {
        self.frozen_size.unwrap_or(0.0)
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }
}
