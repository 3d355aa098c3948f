//! Breakout detector: buffer crossing, trend confirmation and breakout angle.
//!
//! Per tick, given the live price and the last completed close:
//!
//! 1. Buffer levels sit `size * buffer_fraction` outside the frozen range.
//! 2. An active track is cleared when price is back inside the buffer band.
//! 3. A long candidate needs `price >= upper` and `price >= last_close`
//!    (short mirrored).
//! 4. The trend vote must align with the candidate. If the opposite direction
//!    aligns instead, the track is dropped at once as a false breakout.
//! 5. The first confirmed crossing anchors the track at the buffer level.
//! 6. With a non-zero minimum angle the price path from the anchor must be
//!    steep enough. The anchoring tick itself is never judged: it reports
//!    `Anchored` and the angle is measured from the next later tick.
//! 7. Admission clears the track.
//!
//! Angles are measured in percent-of-anchor-price per hour.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::range::OpeningRange;
use super::trend::{Alignment, TrendAligner, TrendConfig, TrendReading};
use crate::domain::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    /// Range-size multiple added outside the range.
    pub buffer_fraction: f64,
    /// Minimum breakout angle in degrees; 0 disables the angle gate.
    pub min_angle_degrees: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self { buffer_fraction: 0.1, min_angle_degrees: 0.0 }
    }
}

/// In-flight breakout excursion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutTrack {
    pub direction: Direction,
    pub anchor_price: f64,
    pub anchor_time: NaiveDateTime,
    pub active: bool,
}

/// Per-tick market inputs.
#[derive(Debug, Clone, Copy)]
pub struct BreakoutInput<'a> {
    pub now: NaiveDateTime,
    pub price: f64,
    pub last_close: f64,
    pub range: &'a OpeningRange,
    /// Completed closes, newest first.
    pub closes: &'a [f64],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub direction: Direction,
    /// Buffer level that was crossed.
    pub level: f64,
    pub trend_fraction: f64,
    pub angle_degrees: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BreakoutDecision {
    /// Price inside the buffer band or not beyond the last close.
    NoCandidate,
    /// Price came back inside the band; the active track was cleared.
    Reset,
    TrendNotAligned { direction: Direction, alignment: Alignment },
    /// The opposite direction is aligned; track cleared.
    FalseBreakout { direction: Direction },
    /// Track anchored on this tick; no elapsed time to measure an angle over yet.
    Anchored { direction: Direction, level: f64 },
    AngleTooShallow { direction: Direction, angle_degrees: f64 },
    Admit(Admission),
}

impl BreakoutDecision {
    pub fn admission(&self) -> Option<Admission> {
        match self {
            Self::Admit(a) => Some(*a),
            _ => None,
        }
    }
}

/// Path angle from `(anchor_time, anchor_price)` to `(now, price)` in degrees.
pub fn breakout_angle(
    anchor_price: f64,
    anchor_time: NaiveDateTime,
    price: f64,
    now: NaiveDateTime,
) -> f64 {
    let elapsed_secs = (now - anchor_time).num_milliseconds().max(1_000) as f64 / 1_000.0;
    let elapsed_hours = elapsed_secs / 3_600.0;
    let base = anchor_price.abs().max(f64::EPSILON);
    let pct_move = (price - anchor_price).abs() / base * 100.0;
    (pct_move / elapsed_hours).atan().to_degrees()
}

#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    buffer_fraction: f64,
    min_angle_degrees: f64,
    aligner: TrendAligner,
    track: Option<BreakoutTrack>,
}

impl BreakoutDetector {
    /// A negative or non-finite buffer reads as 0; the angle is clamped into [0, 90].
    pub fn new(config: &BreakoutConfig, trend: &TrendConfig) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            buffer_fraction: finite_or_zero(config.buffer_fraction).max(0.0),
            min_angle_degrees: finite_or_zero(config.min_angle_degrees).clamp(0.0, 90.0),
            aligner: TrendAligner::new(trend),
            track: None,
        }
    }

    pub fn aligner(&self) -> &TrendAligner {
        &self.aligner
    }

    pub fn track(&self) -> Option<&BreakoutTrack> {
        self.track.as_ref().filter(|t| t.active)
    }

    pub fn reset(&mut self) {
        self.track = None;
    }

    pub fn levels(&self, range: &OpeningRange) -> (f64, f64) {
        (range.upper_buffer(self.buffer_fraction), range.lower_buffer(self.buffer_fraction))
    }

    pub fn evaluate(&mut self, input: &BreakoutInput<'_>) -> BreakoutDecision {
        let (upper, lower) = self.levels(input.range);
        let price = input.price;

        let mut was_reset = false;
        if self.track().is_some() && price < upper && price > lower {
            self.track = None;
            was_reset = true;
        }

        let (direction, level) = if price >= upper && price >= input.last_close {
            (Direction::Long, upper)
        } else if price <= lower && price <= input.last_close {
            (Direction::Short, lower)
        } else if was_reset {
            return BreakoutDecision::Reset;
        } else {
            return BreakoutDecision::NoCandidate;
        };

        let reading: Option<TrendReading> = self.aligner.measure(price, input.closes);
        if self.aligner.alignment(direction.opposite(), reading.as_ref()) == Alignment::Aligned {
            self.track = None;
            return BreakoutDecision::FalseBreakout { direction };
        }
        let alignment = self.aligner.alignment(direction, reading.as_ref());
        let trend_fraction = match (alignment, reading) {
            (Alignment::Aligned, Some(r)) => r.fraction(direction),
            _ => return BreakoutDecision::TrendNotAligned { direction, alignment },
        };

        let track = match self.track() {
            Some(t) if t.direction == direction => *t,
            _ => BreakoutTrack {
                direction,
                anchor_price: level,
                anchor_time: input.now,
                active: true,
            },
        };
        self.track = Some(track);

        let mut angle_degrees = None;
        if self.min_angle_degrees > 0.0 {
            if input.now <= track.anchor_time {
                return BreakoutDecision::Anchored { direction, level: track.anchor_price };
            }
            let angle = breakout_angle(track.anchor_price, track.anchor_time, price, input.now);
            if angle < self.min_angle_degrees {
                return BreakoutDecision::AngleTooShallow { direction, angle_degrees: angle };
            }
            angle_degrees = Some(angle);
        }

        self.track = None;
        BreakoutDecision::Admit(Admission { direction, level, trend_fraction, angle_degrees })
    }
}
