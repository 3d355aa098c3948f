//! Position management: break-even and trailing stops for the open position.
//!
//! All distances are multiples of the frozen opening-range size. The manager
//! proposes stop moves; the engine commits a proposal only after the broker
//! confirms the modification. Committed stops obey the ratchet invariant.

pub mod ratchet;
pub mod stop_manager;

pub use ratchet::RatchetState;
pub use stop_manager::{StopConfig, StopManager};

use serde::{Deserialize, Serialize};

use crate::domain::Position;

/// Why a stop move was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Breakeven,
    Trail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopProposal {
    pub stop: f64,
    pub reason: StopReason,
}

/// Per-position trailing state, reset whenever a new position opens.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingState {
    pub active: bool,
    /// Best price seen since trailing activated.
    pub extreme_price: f64,
    pub breakeven_done: bool,
    ratchet: RatchetState,
}

impl TrailingState {
    pub fn new(position: &Position) -> Self {
        Self {
            active: false,
            extreme_price: position.entry_price,
            breakeven_done: false,
            ratchet: RatchetState::new(position.direction, position.stop_price),
        }
    }

    /// Last stop level applied to the position.
    pub fn last_stop_level(&self) -> f64 {
        self.ratchet.level()
    }

    pub(crate) fn ratchet_mut(&mut self) -> &mut RatchetState {
        &mut self.ratchet
    }
}
