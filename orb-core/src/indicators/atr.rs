//! Average True Range (ATR), streaming.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges.

use crate::domain::Bar;

/// True range of `bar` given the previous close, if any.
pub fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    let high_low = bar.high - bar.low;
    match prev_close {
        Some(pc) => high_low.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        None => high_low,
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Atr {
    /// A zero period is treated as 1.
    pub fn new(period: usize) -> Self {
        Self { period: period.max(1), prev_close: None, seed_sum: 0.0, seed_count: 0, value: None }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Feed one completed bar. Void bars are skipped and leave the state untouched.
    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        if bar.is_void() {
            return self.value;
        }
        let tr = true_range(bar, self.prev_close);
        self.prev_close = Some(bar.close);

        self.value = match self.value {
            Some(prev) => {
                let alpha = 1.0 / self.period as f64;
                Some(prev + alpha * (tr - prev))
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                (self.seed_count == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// ATR over a bar slice; NaN until the seed window fills.
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut atr = Atr::new(period);
    bars.iter().map(|b| atr.update(b).unwrap_or(f64::NAN)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn true_range_uses_gap_from_previous_close() {
        let bars = make_bars(&[100.0]);
        let mut bar = bars[0].clone();
        bar.high = 101.0;
        bar.low = 100.0;
        assert_eq!(true_range(&bar, None), 1.0);
        assert_eq!(true_range(&bar, Some(97.0)), 4.0);
        assert_eq!(true_range(&bar, Some(104.0)), 4.0);
    }

    #[test]
    fn seeds_with_mean_then_smooths() {
        // Constant closes: every TR = high - low = 1.0
        let bars = make_bars(&[100.0; 6]);
        let series = atr_series(&bars, 3);
        assert!(series[0].is_nan());
        assert!(series[1].is_nan());
        assert!((series[2] - 1.0).abs() < 1e-12);
        assert!((series[5] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wilder_step() {
        let mut atr = Atr::new(2);
        let bars = make_bars(&[100.0, 100.0, 103.0]);
        atr.update(&bars[0]);
        assert_eq!(atr.update(&bars[1]), Some(1.0));
        // bar 2: open 100, close 103 -> high 103.5, low 99.5, TR = 4.0
        let v = atr.update(&bars[2]).unwrap();
        assert!((v - 2.5).abs() < 1e-12);
    }

    #[test]
    fn void_bars_are_skipped() {
        let mut atr = Atr::new(1);
        let bars = make_bars(&[100.0]);
        assert_eq!(atr.update(&bars[0]), Some(1.0));
        let mut void = bars[0].clone();
        void.high = f64::NAN;
        assert_eq!(atr.update(&void), Some(1.0));
    }

    #[test]
    fn zero_period_acts_as_one() {
        let mut atr = Atr::new(0);
        assert_eq!(atr.period(), 1);
        let bars = make_bars(&[100.0]);
        assert_eq!(atr.update(&bars[0]), Some(1.0));
    }
}
