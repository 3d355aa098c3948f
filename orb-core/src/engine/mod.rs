//! Session engine: the state machine that sequences the components across
//! the trading day.

pub mod machine;
pub mod state;

pub use machine::SessionEngine;
pub use state::{Action, ActionStatus, EngineError, Evaluation, SessionState, SkipReason};
