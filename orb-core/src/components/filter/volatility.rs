//! Volatility gate: current ATR against its rolling in-session median.
//!
//! Samples are taken only during session hours, at most one per minute. The
//! median is recomputed lazily: on first use, once the recompute interval has
//! elapsed, or while it was last computed from fewer than `min_samples`
//! readings. The sample buffer is trimmed FIFO to `max_samples` after each
//! recomputation.

use chrono::{Duration, DurationRound, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use super::{FilterEvaluation, FilterVerdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub enabled: bool,
    /// Pass when `current >= median * threshold_fraction`.
    pub threshold_fraction: f64,
    /// Below this many samples the gate passes.
    pub min_samples: usize,
    pub max_samples: usize,
    pub recompute_interval_hours: i64,
    /// Period of the streaming ATR used when the host supplies no reading.
    pub atr_period: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_fraction: 0.8,
            min_samples: 100,
            max_samples: 20_000,
            recompute_interval_hours: 24 * 7,
            atr_period: 14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VolatilityGate {
    config: VolatilityConfig,
    samples: VecDeque<f64>,
    last_minute: Option<NaiveDateTime>,
    median: Option<f64>,
    computed_at: Option<NaiveDateTime>,
    computed_from: usize,
}

fn median_of(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

impl VolatilityGate {
    pub fn new(config: VolatilityConfig) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
            last_minute: None,
            median: None,
            computed_at: None,
            computed_from: 0,
        }
    }

    /// Record one indicator reading. Dropped outside session hours, for
    /// non-finite values, and when a sample already exists for this minute.
    pub fn record(&mut self, now: NaiveDateTime, value: f64, within_session: bool) -> bool {
        if !within_session || !value.is_finite() || value < 0.0 {
            return false;
        }
        let minute = now.duration_trunc(Duration::minutes(1)).unwrap_or(now);
        if self.last_minute == Some(minute) {
            return false;
        }
        self.last_minute = Some(minute);
        self.samples.push_back(value);
        true
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Last computed median, without triggering a recomputation.
    pub fn cached_median(&self) -> Option<f64> {
        self.median
    }

    fn recompute_due(&self, now: NaiveDateTime) -> bool {
        match self.computed_at {
            None => true,
            Some(at) => {
                self.computed_from < self.config.min_samples
                    || now - at >= Duration::hours(self.config.recompute_interval_hours)
            }
        }
    }

    /// Median of retained samples, recomputing if due.
    pub fn median(&mut self, now: NaiveDateTime) -> Option<f64> {
        if self.recompute_due(now) {
            let mut values: Vec<f64> = self.samples.iter().copied().collect();
            self.median = median_of(&mut values);
            self.computed_at = Some(now);
            self.computed_from = values.len();
            while self.samples.len() > self.config.max_samples {
                self.samples.pop_front();
            }
            debug!(
                median = ?self.median,
                samples = self.computed_from,
                retained = self.samples.len(),
                "volatility median recomputed"
            );
        }
        self.median
    }

    /// Gate the current reading against the rolling median.
    pub fn evaluate(&mut self, now: NaiveDateTime, current: Option<f64>) -> FilterEvaluation {
        let samples = self.samples.len();
        if !self.config.enabled {
            return FilterEvaluation {
                verdict: FilterVerdict::Disabled,
                current,
                median: None,
                samples,
            };
        }

        let median = self.median(now);
        let verdict = match (current, median) {
            _ if samples < self.config.min_samples => FilterVerdict::PassedInsufficientHistory,
            (None, _) => FilterVerdict::PassedNoReading,
            (Some(c), _) if !c.is_finite() => FilterVerdict::PassedNoReading,
            (_, None) => FilterVerdict::PassedInsufficientHistory,
            (Some(c), Some(m)) if c >= m * self.config.threshold_fraction => FilterVerdict::Passed,
            (Some(_), Some(_)) => FilterVerdict::FilteredByVolatility,
        };

        FilterEvaluation { verdict, current, median, samples }
    }
}
