//! Session states, per-tick actions and evaluation results.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::components::SizingError;
use crate::config::ConfigError;
use crate::session::ClockError;

/// Trading-day state machine.
///
/// `Idle -> BuildingRange -> RangeLocked -> InPosition -> AfterHoursPosition -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    BuildingRange,
    RangeLocked,
    InPosition,
    AfterHoursPosition,
}

impl SessionState {
    pub fn has_position(self) -> bool {
        matches!(self, Self::InPosition | Self::AfterHoursPosition)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::BuildingRange => "building_range",
            Self::RangeLocked => "range_locked",
            Self::InPosition => "in_position",
            Self::AfterHoursPosition => "after_hours_position",
        };
        f.write_str(name)
    }
}

/// What the engine did (or tried to do) on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    OpenLong,
    OpenShort,
    ModifyStop,
    CloseForSessionEnd,
    CloseForHoliday,
}

/// Why an admission path short-circuited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    VolatilityFiltered,
    DailyCapReached,
    PositionOpen,
    SpreadTooWide,
    DataUnavailable,
    InvalidQuote,
    /// Formation window ended without a usable bar.
    RangeNotFormed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Done,
    /// The broker refused; state is unchanged and the tick can be retried.
    Rejected(String),
    Skipped(SkipReason),
}

/// Result of one `evaluate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub action: Action,
    pub status: ActionStatus,
    /// State after the tick.
    pub state: SessionState,
}

impl Evaluation {
    pub fn none() -> Self {
        Self::done(Action::None)
    }

    pub fn done(action: Action) -> Self {
        Self { action, status: ActionStatus::Done, state: SessionState::Idle }
    }

    pub fn rejected(action: Action, reason: impl fmt::Display) -> Self {
        Self { action, status: ActionStatus::Rejected(reason.to_string()), state: SessionState::Idle }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self { action: Action::None, status: ActionStatus::Skipped(reason), state: SessionState::Idle }
    }

    /// Nothing attempted and nothing skipped.
    pub fn is_quiet(&self) -> bool {
        self.action == Action::None && self.status == ActionStatus::Done
    }

    pub fn is_done(&self) -> bool {
        self.status == ActionStatus::Done
    }
}

/// Failures `evaluate` cannot turn into a retryable outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("session clock: {0}")]
    Clock(#[from] ClockError),

    #[error("position sizing: {0}")]
    Sizing(#[from] SizingError),
}
