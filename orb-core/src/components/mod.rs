//! Decision components: the pieces the session engine sequences each tick.
//!
//! - Range tracker: opening-range high/low during the formation window
//! - Trend aligner: majority vote of recent directional closes
//! - Breakout detector: buffer crossing, trend gate, breakout angle
//! - Signal source: pluggable entry logic (the ORB signal wraps the detector)
//! - Volatility filter: current ATR against its rolling median
//! - Position sizer: risk percentage to broker lots
//! - Position management: break-even then trailing stop, ratcheted

pub mod breakout;
pub mod filter;
pub mod pm;
pub mod range;
pub mod signal;
pub mod sizing;
pub mod trend;

pub use breakout::{
    breakout_angle, Admission, BreakoutConfig, BreakoutDecision, BreakoutDetector, BreakoutTrack,
};
pub use filter::{FilterEvaluation, FilterVerdict, VolatilityConfig, VolatilityGate};
pub use pm::{RatchetState, StopConfig, StopManager, StopProposal, StopReason, TrailingState};
pub use range::{OpeningRange, RangeTracker};
pub use signal::{OrbSignal, SignalContext, SignalEvent, SignalSource};
pub use sizing::{PositionSizer, SizedOrder, SizingError, SizingRequest};
pub use trend::{Alignment, TrendAligner, TrendConfig, TrendReading};
