use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Ticket;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// True if `candidate` is strictly more favorable than `current` for this direction
    /// (higher for longs, lower for shorts).
    pub fn improves(self, candidate: f64, current: f64) -> bool {
        (candidate - current) * self.sign() > 0.0
    }
}

/// An open position confirmed by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticket: Ticket,
    pub direction: Direction,
    pub volume: f64,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub opened_at: NaiveDateTime,
}

impl Position {
    /// Price distance moved in the trade's favor (negative when under water).
    pub fn favorable_move(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign()
    }

    /// Distance between entry and the stop currently on the position.
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn opened_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(17, 0, 0).unwrap()
    }

    fn position(direction: Direction) -> Position {
        Position {
            ticket: Ticket(1),
            direction,
            volume: 1.0,
            entry_price: 100.0,
            stop_price: if direction == Direction::Long { 95.0 } else { 105.0 },
            target_price: if direction == Direction::Long { 110.0 } else { 90.0 },
            opened_at: opened_at(),
        }
    }

    #[test]
    fn favorable_move_is_signed_by_direction() {
        assert_eq!(position(Direction::Long).favorable_move(103.0), 3.0);
        assert_eq!(position(Direction::Short).favorable_move(103.0), -3.0);
        assert_eq!(position(Direction::Short).favorable_move(96.0), 4.0);
    }

    #[test]
    fn improves_respects_direction() {
        assert!(Direction::Long.improves(101.0, 100.0));
        assert!(!Direction::Long.improves(99.0, 100.0));
        assert!(Direction::Short.improves(99.0, 100.0));
        assert!(!Direction::Short.improves(100.0, 100.0));
    }

    #[test]
    fn stop_distance_is_absolute() {
        assert_eq!(position(Direction::Long).stop_distance(), 5.0);
        assert_eq!(position(Direction::Short).stop_distance(), 5.0);
    }
}
