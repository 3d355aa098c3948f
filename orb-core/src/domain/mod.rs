//! Domain types for the opening-range breakout engine

pub mod bar;
pub mod ids;
pub mod instrument;
pub mod position;

pub use bar::Bar;
pub use ids::Ticket;
pub use instrument::{InstrumentKind, InstrumentSpec, TickPolicy};
pub use position::{Direction, Position};
