//! Risk-based position sizing.
//!
//! # Formula
//! ```text
//! risk_amount    = equity * risk_pct / 100
//! stop_points    = |entry - stop| / point
//! raw_lots       = risk_amount / (stop_points * value_per_point)
//! lots           = floor_to_step(raw_lots), clamped to max_lot
//! ```
//!
//! Value per point per lot depends on the instrument convention:
//! - metals and index CFDs: fixed $1
//! - currency pairs: `point / quote_rate * contract_size`, where `quote_rate`
//!   converts the quote currency into the account currency (1.0 for
//!   USD-quoted pairs on a USD account; yen pairs default to the entry price)
//! - anything else: broker `tick_value / tick_size * point`
//!
//! Rounding only ever shrinks the size, and a size under `min_lot` is an
//! error rather than being rounded up, so `actual_risk <= requested_risk`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{InstrumentKind, InstrumentSpec};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub equity: f64,
    /// Percent of equity, e.g. 1.0 for 1%.
    pub risk_pct: f64,
    pub entry: f64,
    pub stop: f64,
    /// Quote-to-account conversion; convention default when `None`.
    pub quote_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizedOrder {
    pub lots: f64,
    pub raw_lots: f64,
    pub stop_points: f64,
    pub value_per_point: f64,
    pub requested_risk: f64,
    /// Risk implied by the rounded `lots`.
    pub actual_risk: f64,
}

impl SizedOrder {
    /// Requested minus realized risk; never negative.
    pub fn rounding_shortfall(&self) -> f64 {
        self.requested_risk - self.actual_risk
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("account equity must be positive, got {0}")]
    NonPositiveEquity(f64),

    #[error("risk percentage must be in (0, 100], got {0}")]
    InvalidRiskPct(f64),

    #[error("stop distance is zero at entry {entry}")]
    ZeroStopDistance { entry: f64 },

    #[error("quote conversion rate must be positive, got {0}")]
    InvalidQuoteRate(f64),

    #[error("no usable value per point for {symbol} (tick_value={tick_value}, tick_size={tick_size})")]
    InvalidValuePerPoint { symbol: String, tick_value: f64, tick_size: f64 },

    #[error("size {lots} lots is below the broker minimum {min_lot}")]
    BelowMinimumLot { lots: f64, min_lot: f64 },
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    spec: InstrumentSpec,
}

impl PositionSizer {
    pub fn new(spec: InstrumentSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &InstrumentSpec {
        &self.spec
    }

    /// Account-currency value of a one-point move for one lot.
    pub fn value_per_point(&self, entry: f64, quote_rate: Option<f64>) -> Result<f64, SizingError> {
        let spec = &self.spec;
        match spec.kind() {
            InstrumentKind::Metal | InstrumentKind::Index => Ok(1.0),
            kind @ (InstrumentKind::Forex | InstrumentKind::ForexJpy) => {
                let rate = match (quote_rate, kind) {
                    (Some(r), _) => r,
                    (None, InstrumentKind::ForexJpy) => entry,
                    (None, _) => 1.0,
                };
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(SizingError::InvalidQuoteRate(rate));
                }
                Ok(spec.point() / rate * spec.contract_size)
            }
            InstrumentKind::Other => {
                if !(spec.tick_size > 0.0 && spec.tick_value > 0.0) {
                    return Err(SizingError::InvalidValuePerPoint {
                        symbol: spec.symbol.clone(),
                        tick_value: spec.tick_value,
                        tick_size: spec.tick_size,
                    });
                }
                warn!(
                    symbol = %spec.symbol,
                    tick_value = spec.tick_value,
                    tick_size = spec.tick_size,
                    "unrecognized instrument, sizing from broker tick value"
                );
                Ok(spec.tick_value / spec.tick_size * spec.point())
            }
        }
    }

    pub fn size(&self, req: &SizingRequest) -> Result<SizedOrder, SizingError> {
        if !(req.equity.is_finite() && req.equity > 0.0) {
            return Err(SizingError::NonPositiveEquity(req.equity));
        }
        if !(req.risk_pct > 0.0 && req.risk_pct <= 100.0) {
            return Err(SizingError::InvalidRiskPct(req.risk_pct));
        }
        let stop_points = self.spec.to_points(req.entry - req.stop);
        if !(stop_points.is_finite() && stop_points > 0.0) {
            return Err(SizingError::ZeroStopDistance { entry: req.entry });
        }

        let value_per_point = self.value_per_point(req.entry, req.quote_rate)?;
        let requested_risk = req.equity * req.risk_pct / 100.0;
        let raw_lots = requested_risk / (stop_points * value_per_point);
        let lots = self.spec.round_lots_down(raw_lots);

        if lots <= 0.0 || lots < self.spec.min_lot {
            return Err(SizingError::BelowMinimumLot { lots, min_lot: self.spec.min_lot });
        }

        Ok(SizedOrder {
            lots,
            raw_lots,
            stop_points,
            value_per_point,
            requested_risk,
            actual_risk: lots * stop_points * value_per_point,
        })
    }
}
