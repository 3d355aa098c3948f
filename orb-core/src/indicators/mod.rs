//! Volatility indicators computed from completed bars.
//!
//! Hosts with their own indicator feed pass readings straight into the
//! engine snapshot; these are for hosts that only have bars (the CLI replay).

pub mod atr;

pub use atr::{atr_series, true_range, Atr};

/// Build one-minute bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low = open/close ± 0.5.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::minutes(i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
            )
        })
        .collect()
}
