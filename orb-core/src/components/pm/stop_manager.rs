//! Break-even then trail, both scaled by the opening-range size.
//!
//! Break-even: once the favorable move reaches `breakeven_trigger_fraction * size`,
//! the stop goes to entry, once. Trailing: once the move reaches
//! `trailing_start_fraction * size`, the best price is tracked and the stop
//! follows at `trailing_distance_fraction * size` behind it, in increments of
//! at least `trailing_step_fraction * size`.

use serde::{Deserialize, Serialize};

use super::{StopProposal, StopReason, TrailingState};
use crate::domain::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConfig {
    /// 0 disables break-even.
    pub breakeven_trigger_fraction: f64,
    pub trailing_start_fraction: f64,
    /// 0 disables trailing.
    pub trailing_distance_fraction: f64,
    pub trailing_step_fraction: f64,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            breakeven_trigger_fraction: 0.5,
            trailing_start_fraction: 1.0,
            trailing_distance_fraction: 0.5,
            trailing_step_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StopManager {
    config: StopConfig,
}

impl StopManager {
    pub fn new(config: StopConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StopConfig {
        &self.config
    }

    /// Observe `price` (bid for longs, ask for shorts) and propose a stop move.
    ///
    /// Only the trailing extreme is updated here; break-even and the applied
    /// level change in [`StopManager::commit`].
    pub fn on_price(
        &self,
        state: &mut TrailingState,
        position: &Position,
        price: f64,
        range_size: f64,
    ) -> Option<StopProposal> {
        if !(range_size > 0.0) || !price.is_finite() {
            return None;
        }
        let dir = position.direction;
        let profit = position.favorable_move(price);
        let current = position.stop_price;

        if !state.active
            && self.config.trailing_distance_fraction > 0.0
            && profit >= self.config.trailing_start_fraction * range_size
        {
            state.active = true;
            state.extreme_price = price;
        } else if state.active && dir.improves(price, state.extreme_price) {
            state.extreme_price = price;
        }

        let mut best: Option<StopProposal> = None;

        if !state.breakeven_done
            && self.config.breakeven_trigger_fraction > 0.0
            && profit >= self.config.breakeven_trigger_fraction * range_size
        {
            if dir.improves(position.entry_price, current) {
                best = Some(StopProposal { stop: position.entry_price, reason: StopReason::Breakeven });
            } else {
                // Stop already at or beyond entry: nothing to send.
                state.breakeven_done = true;
            }
        }

        if state.active && self.config.trailing_distance_fraction > 0.0 {
            let distance = self.config.trailing_distance_fraction * range_size;
            let step = self.config.trailing_step_fraction.max(0.0) * range_size;
            let candidate = state.extreme_price - dir.sign() * distance;
            let gain = (candidate - state.last_stop_level()) * dir.sign();

            let beats_best = best.map_or(true, |b| dir.improves(candidate, b.stop));
            if dir.improves(candidate, current) && gain >= step && gain > 0.0 && beats_best {
                best = Some(StopProposal { stop: candidate, reason: StopReason::Trail });
            }
        }

        // A stop on the wrong side of the market would fill immediately.
        best.filter(|p| dir.improves(price, p.stop))
    }

    /// Apply a broker-confirmed proposal. Returns the stop now on the position.
    pub fn commit(
        &self,
        state: &mut TrailingState,
        position: &mut Position,
        proposal: &StopProposal,
    ) -> f64 {
        let level = state.ratchet_mut().apply(proposal.stop);
        position.stop_price = level;
        if proposal.reason == StopReason::Breakeven || !position.direction.improves(position.entry_price, level) {
            state.breakeven_done = true;
        }
        level
    }
}
