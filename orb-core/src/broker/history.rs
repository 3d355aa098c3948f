//! In-memory completed-bar history implementing [`MarketData`].

use chrono::NaiveDateTime;

use super::{DataError, MarketData};
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct BarHistory {
    /// Oldest first.
    bars: Vec<Bar>,
    feed_down: bool,
}

impl BarHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bars(bars: Vec<Bar>) -> Self {
        Self { bars, feed_down: false }
    }

    /// Append a completed bar. Bars must arrive in time order.
    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Simulate a market-data outage.
    pub fn set_feed_down(&mut self, down: bool) {
        self.feed_down = down;
    }

    fn check_feed(&self) -> Result<(), DataError> {
        if self.feed_down {
            Err(DataError::FeedUnavailable("bar history offline".into()))
        } else {
            Ok(())
        }
    }
}

impl MarketData for BarHistory {
    fn completed_bars(&self, count: usize) -> Result<Vec<Bar>, DataError> {
        self.check_feed()?;
        if self.bars.is_empty() {
            return Err(DataError::NoBars);
        }
        Ok(self.bars.iter().rev().take(count).copied().collect())
    }

    fn bars_since(&self, since: NaiveDateTime) -> Result<Vec<Bar>, DataError> {
        self.check_feed()?;
        let first = self.bars.partition_point(|b| b.time < since);
        Ok(self.bars[first..].to_vec())
    }
}
