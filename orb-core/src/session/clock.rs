//! Session clock: venue opening hours projected onto the server clock.
//!
//! Pure function of `(now, calendar)`: the engine calls [`SessionClock::session_at`]
//! on every tick instead of caching, so a corrected clock or calendar takes
//! effect on the next tick.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::calendar::TradingCalendar;

/// Upper bound on the day-by-day search for the next trading day.
pub const MAX_LOOKAHEAD_DAYS: u32 = 14;

/// Opening-hour presets, in venue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    /// Regular cash open, 09:30.
    CashOpen,
    /// Early open, 08:00.
    EarlyOpen,
    Custom { hour: u32, minute: u32 },
}

impl SessionPreset {
    pub fn open_hm(self) -> (u32, u32) {
        match self {
            Self::CashOpen => (9, 30),
            Self::EarlyOpen => (8, 0),
            Self::Custom { hour, minute } => (hour, minute),
        }
    }
}

/// Session timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub preset: SessionPreset,
    /// Hours added to venue time to get server-local time.
    pub venue_offset_hours: i32,
    /// Length of the opening-range formation window.
    pub range_minutes: u32,
    /// Session close, venue hour.
    pub close_hour: u32,
    /// Keep an open position past the close, until shortly before the next open.
    pub allow_after_hours: bool,
    /// Forced-close lead time ahead of the next session start.
    pub close_before_next_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preset: SessionPreset::CashOpen,
            venue_offset_hours: 0,
            range_minutes: 30,
            close_hour: 16,
            allow_after_hours: false,
            close_before_next_minutes: 15,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ClockError {
    #[error("invalid session open {hour:02}:{minute:02}")]
    InvalidOpen { hour: u32, minute: u32 },

    #[error("invalid session close hour {0}")]
    InvalidClose(u32),

    #[error("opening range must be 1 minute or longer")]
    EmptyRange,

    #[error("opening range ({range_minutes} min from {open}) overruns the {close} close")]
    RangeOverrunsClose { open: NaiveTime, close: NaiveTime, range_minutes: u32 },

    #[error("no trading day within {days} days after {after}")]
    LookaheadExhausted { after: NaiveDate, days: u32 },
}

/// One trading session on the server-local clock.
///
/// Invariant: `start < range_end <= end < next_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Venue date the session belongs to.
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub range_end: NaiveDateTime,
    pub end: NaiveDateTime,
    pub next_start: NaiveDateTime,
}

impl Session {
    /// Inside the opening-range formation window `[start, range_end)`.
    pub fn in_formation(&self, now: NaiveDateTime) -> bool {
        now >= self.start && now < self.range_end
    }

    /// Inside session hours `[start, end)`.
    pub fn within_hours(&self, now: NaiveDateTime) -> bool {
        now >= self.start && now < self.end
    }

    /// Between the close and the next session start.
    pub fn after_hours(&self, now: NaiveDateTime) -> bool {
        now >= self.end && now < self.next_start
    }
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    open: NaiveTime,
    close: NaiveTime,
    range: Duration,
    offset: Duration,
}

impl SessionClock {
    pub fn new(config: &SessionConfig) -> Result<Self, ClockError> {
        let (hour, minute) = config.preset.open_hm();
        let open = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(ClockError::InvalidOpen { hour, minute })?;
        let close = NaiveTime::from_hms_opt(config.close_hour, 0, 0)
            .ok_or(ClockError::InvalidClose(config.close_hour))?;
        if config.range_minutes == 0 {
            return Err(ClockError::EmptyRange);
        }
        let range = Duration::minutes(i64::from(config.range_minutes));
        // NaiveTime + Duration wraps at midnight, so compare in minutes of day.
        let open_min = i64::from(hour) * 60 + i64::from(minute);
        if open_min + range.num_minutes() > i64::from(config.close_hour) * 60 {
            return Err(ClockError::RangeOverrunsClose {
                open,
                close,
                range_minutes: config.range_minutes,
            });
        }
        Ok(Self {
            open,
            close,
            range,
            offset: Duration::hours(i64::from(config.venue_offset_hours)),
        })
    }

    /// Venue-local date for a server-local timestamp.
    pub fn venue_date(&self, now: NaiveDateTime) -> NaiveDate {
        (now - self.offset).date()
    }

    fn start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.open) + self.offset
    }

    fn end_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.close) + self.offset
    }

    /// Session containing `now`, or the most recently elapsed one when `now` is
    /// between a close and the following open.
    pub fn session_at(
        &self,
        now: NaiveDateTime,
        calendar: &dyn TradingCalendar,
    ) -> Result<Session, ClockError> {
        let today = self.venue_date(now);
        let candidates = [
            today - Duration::days(1),
            today,
            today + Duration::days(1),
        ];

        let containing = candidates
            .iter()
            .copied()
            .find(|d| self.start_on(*d) <= now && now < self.end_on(*d));
        let date = match containing {
            Some(d) => d,
            None => candidates
                .iter()
                .rev()
                .copied()
                .find(|d| self.end_on(*d) <= now)
                .unwrap_or(candidates[0]),
        };

        let next_date = self.next_trading_day(date, calendar)?;
        let start = self.start_on(date);
        Ok(Session {
            date,
            start,
            range_end: start + self.range,
            end: self.end_on(date),
            next_start: self.start_on(next_date),
        })
    }

    /// First trading day strictly after `date`.
    pub fn next_trading_day(
        &self,
        date: NaiveDate,
        calendar: &dyn TradingCalendar,
    ) -> Result<NaiveDate, ClockError> {
        let mut day = date;
        for _ in 0..MAX_LOOKAHEAD_DAYS {
            day += Duration::days(1);
            if calendar.is_trading_day(day) {
                return Ok(day);
            }
        }
        Err(ClockError::LookaheadExhausted { after: date, days: MAX_LOOKAHEAD_DAYS })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::calendar::WeekdayCalendar;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn clock(offset: i32) -> SessionClock {
        SessionClock::new(&SessionConfig { venue_offset_hours: offset, ..Default::default() })
            .unwrap()
    }

    #[test]
    fn session_inside_hours() {
        // Tuesday, server clock 7h ahead of venue
        let s = clock(7).session_at(at(2024, 3, 5, 17, 0), &WeekdayCalendar).unwrap();
        assert_eq!(s.start, at(2024, 3, 5, 16, 30));
        assert_eq!(s.range_end, at(2024, 3, 5, 17, 0));
        assert_eq!(s.end, at(2024, 3, 5, 23, 0));
        assert_eq!(s.next_start, at(2024, 3, 6, 16, 30));
        assert!(s.within_hours(at(2024, 3, 5, 17, 0)));
        assert!(!s.in_formation(at(2024, 3, 5, 17, 0)));
    }

    #[test]
    fn after_close_selects_elapsed_session() {
        let s = clock(7).session_at(at(2024, 3, 5, 23, 30), &WeekdayCalendar).unwrap();
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!(s.after_hours(at(2024, 3, 5, 23, 30)));
    }

    #[test]
    fn pre_open_selects_previous_session() {
        // 01:00 server on Wednesday is still Tuesday evening at the venue
        let s = clock(7).session_at(at(2024, 3, 6, 1, 0), &WeekdayCalendar).unwrap();
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        let s = clock(7).session_at(at(2024, 3, 6, 10, 0), &WeekdayCalendar).unwrap();
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(s.next_start, at(2024, 3, 6, 16, 30));
    }

    #[test]
    fn next_start_skips_weekend() {
        let s = clock(0).session_at(at(2024, 3, 8, 10, 0), &WeekdayCalendar).unwrap();
        assert_eq!(s.next_start, at(2024, 3, 11, 9, 30));
    }

    #[test]
    fn lookahead_is_bounded() {
        let closed = |_: NaiveDate| false;
        let err = clock(0).session_at(at(2024, 3, 8, 10, 0), &closed).unwrap_err();
        assert!(matches!(err, ClockError::LookaheadExhausted { days: MAX_LOOKAHEAD_DAYS, .. }));
    }

    #[test]
    fn negative_offset() {
        let s = clock(-6).session_at(at(2024, 3, 5, 4, 0), &WeekdayCalendar).unwrap();
        assert_eq!(s.start, at(2024, 3, 5, 3, 30));
        assert_eq!(s.end, at(2024, 3, 5, 10, 0));
    }

    #[test]
    fn early_open_preset() {
        let cfg = SessionConfig { preset: SessionPreset::EarlyOpen, ..Default::default() };
        let s = SessionClock::new(&cfg)
            .unwrap()
            .session_at(at(2024, 3, 5, 8, 10), &WeekdayCalendar)
            .unwrap();
        assert_eq!(s.start, at(2024, 3, 5, 8, 0));
        assert!(s.in_formation(at(2024, 3, 5, 8, 10)));
    }

    #[test]
    fn rejects_range_past_close() {
        let cfg = SessionConfig { range_minutes: 400, close_hour: 15, ..Default::default() };
        assert!(matches!(
            SessionClock::new(&cfg),
            Err(ClockError::RangeOverrunsClose { .. })
        ));
        let cfg = SessionConfig { range_minutes: 0, ..Default::default() };
        assert_eq!(SessionClock::new(&cfg).unwrap_err(), ClockError::EmptyRange);
    }

    #[test]
    fn rejects_invalid_custom_open() {
        let cfg = SessionConfig {
            preset: SessionPreset::Custom { hour: 25, minute: 0 },
            ..Default::default()
        };
        assert!(matches!(SessionClock::new(&cfg), Err(ClockError::InvalidOpen { .. })));
    }
}
