//! Trading-day predicates.
//!
//! The engine only ever asks one question of a calendar: is this venue date a
//! trading day? Holiday tables live with the host; `HolidayCalendar` takes an
//! explicit date list.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Venue trading-day predicate.
pub trait TradingCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool;
}

impl<F> TradingCalendar for F
where
    F: Fn(NaiveDate) -> bool,
{
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday through Friday, no holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayCalendar;

impl TradingCalendar for WeekdayCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        is_weekday(date)
    }
}

/// Weekdays minus an explicit set of venue holidays.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self { holidays: holidays.into_iter().collect() }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

impl TradingCalendar for HolidayCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        is_weekday(date) && !self.is_holiday(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekends_are_closed() {
        let cal = WeekdayCalendar;
        assert!(cal.is_trading_day(d(2024, 3, 8))); // Friday
        assert!(!cal.is_trading_day(d(2024, 3, 9)));
        assert!(!cal.is_trading_day(d(2024, 3, 10)));
        assert!(cal.is_trading_day(d(2024, 3, 11)));
    }

    #[test]
    fn holidays_are_closed() {
        let cal = HolidayCalendar::new([d(2024, 7, 4)]);
        assert!(!cal.is_trading_day(d(2024, 7, 4)));
        assert!(cal.is_trading_day(d(2024, 7, 5)));
        assert_eq!(cal.len(), 1);
    }

    #[test]
    fn closures_are_calendars() {
        let never = |_: NaiveDate| false;
        assert!(!never.is_trading_day(d(2024, 3, 8)));
    }
}
