//! Seeded random-walk one-minute bars, for demos and benchmarks.
//!
//! Same seed, same bars. Results on synthetic data say nothing about the
//! strategy; the generator exists to drive the engine end to end.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    /// Open time of the first bar.
    pub start: NaiveDateTime,
    pub minutes: usize,
    pub start_price: f64,
    /// Half-width of the uniform per-minute return.
    pub minute_volatility: f64,
    /// Mean per-minute return.
    pub drift: f64,
}

impl SyntheticConfig {
    pub fn new(start: NaiveDateTime, minutes: usize) -> Self {
        Self { start, minutes, start_price: 100.0, minute_volatility: 0.001, drift: 0.0 }
    }
}

/// One bar per minute from `config.start`.
pub fn random_walk_bars(config: &SyntheticConfig, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vol = config.minute_volatility.abs().max(f64::EPSILON);
    let mut price = config.start_price;
    let mut bars = Vec::with_capacity(config.minutes);

    for i in 0..config.minutes {
        let ret: f64 = config.drift + rng.gen_range(-vol..vol);
        let open = price;
        let close = (price * (1.0 + ret)).max(f64::EPSILON);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol));
        bars.push(Bar::new(config.start + Duration::minutes(i as i64), open, high, low, close));
        price = close;
    }
    bars
}
