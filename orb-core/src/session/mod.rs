//! Trading-session timing: venue calendar and per-tick session boundaries.

pub mod calendar;
pub mod clock;

pub use calendar::{HolidayCalendar, TradingCalendar, WeekdayCalendar};
pub use clock::{ClockError, Session, SessionClock, SessionConfig, SessionPreset, MAX_LOOKAHEAD_DAYS};
