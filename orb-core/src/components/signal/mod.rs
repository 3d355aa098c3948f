//! Signal sources: detect a directional entry candidate from market state.
//!
//! A source sees the frozen range and recent prices, never the account or the
//! open position: sizing, session sequencing and stop management stay in the
//! engine so every strategy shares them.

pub mod orb;

pub use orb::OrbSignal;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::range::OpeningRange;
use crate::domain::Direction;

/// Market state handed to a signal source on each armed tick.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub now: NaiveDateTime,
    pub bid: f64,
    pub ask: f64,
    pub last_close: f64,
    pub range: &'a OpeningRange,
    /// Completed closes, newest first.
    pub closes: &'a [f64],
}

impl SignalContext<'_> {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// A directional entry candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub time: NaiveDateTime,
    pub direction: Direction,
    /// Conviction in [0, 1].
    pub strength: f64,
    /// Free-form context (breakout level, angle, ...).
    pub metadata: HashMap<String, f64>,
}

/// Pluggable entry logic.
pub trait SignalSource: Send {
    /// Human-readable name (e.g., "orb_breakout").
    fn name(&self) -> &str;

    /// Completed closes `evaluate` wants in `SignalContext::closes`.
    fn closes_needed(&self) -> usize;

    /// Drop per-session state.
    fn on_session_start(&mut self);

    /// Returns `Some(SignalEvent)` when a trade should be admitted.
    fn evaluate(&mut self, ctx: &SignalContext<'_>) -> Option<SignalEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn mid_is_average_of_bid_ask() {
        let range = OpeningRange::new(110.0, 100.0);
        let ctx = SignalContext {
            now: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(10, 0, 0).unwrap(),
            bid: 100.0,
            ask: 100.2,
            last_close: 100.0,
            range: &range,
            closes: &[],
        };
        assert!((ctx.mid() - 100.1).abs() < 1e-12);
    }
}
