//! ORB Core: opening-range breakout decision engine.
//!
//! This crate contains everything between a price feed and an order router:
//! - Domain types (bars, instruments, positions)
//! - Session clock and trading calendars
//! - Opening-range tracking, trend alignment and breakout confirmation
//! - Volatility gate over a rolling in-session ATR median
//! - Risk-based position sizing across instrument conventions
//! - Break-even and trailing stop management with the ratchet invariant
//! - Broker/market-data ports with an in-memory paper broker
//! - The per-instrument session state machine

pub mod broker;
pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod session;
pub mod synthetic;

pub use config::{ConfigError, EngineConfig, RiskConfig, StopPlacement};
pub use engine::{Action, ActionStatus, EngineError, Evaluation, SessionEngine, SessionState};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: an engine can be moved onto a worker thread, and its
    /// plain data types can be shared.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<SessionEngine>();
        require_send::<broker::PaperBroker>();

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::InstrumentSpec>();
        require_sync::<domain::InstrumentSpec>();

        require_send::<session::Session>();
        require_sync::<session::Session>();
        require_send::<components::OpeningRange>();
        require_sync::<components::OpeningRange>();
        require_send::<components::SignalEvent>();
        require_sync::<components::SignalEvent>();
        require_send::<components::OrbSignal>();
        require_sync::<components::OrbSignal>();

        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<Evaluation>();
        require_sync::<Evaluation>();
    }

    /// Architecture contract: signal sources see market state only.
    ///
    /// `SignalContext` carries quotes, the frozen range and closes. If someone
    /// adds account or position state, this stops compiling.
    #[test]
    fn signal_source_sees_no_position() {
        fn _check_trait_object_builds(
            sig: &mut dyn components::SignalSource,
            range: &components::OpeningRange,
            now: chrono::NaiveDateTime,
        ) -> Option<components::SignalEvent> {
            sig.evaluate(&components::SignalContext {
                now,
                bid: 1.0,
                ask: 1.0,
                last_close: 1.0,
                range,
                closes: &[],
            })
        }
    }
}
