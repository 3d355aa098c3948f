//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! holidays = ["2024-12-25"]
//!
//! [instrument]
//! symbol = "US30"
//! point = 0.1
//!
//! [session]
//! preset = "cash_open"
//! venue_offset_hours = 7
//! range_minutes = 30
//!
//! [risk]
//! risk_pct = 0.5
//! reward_ratio = 2.0
//! ```
//!
//! Every field except `instrument.symbol` has a default.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{BreakoutConfig, StopConfig, TrendConfig, VolatilityConfig};
use crate::domain::InstrumentSpec;
use crate::session::{ClockError, HolidayCalendar, SessionClock, SessionConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("session: {0}")]
    Session(#[from] ClockError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

/// Where the initial stop goes relative to the frozen range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPlacement {
    /// Range low for longs, range high for shorts.
    #[default]
    OppositeSide,
    Midpoint,
}

/// Per-run risk settings. Read-only for the engine's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Percent of equity risked per trade.
    pub risk_pct: f64,
    /// Target distance as a multiple of the stop distance.
    pub reward_ratio: f64,
    pub max_trades_per_day: u32,
    pub stop_placement: StopPlacement,
    /// Block admission while the spread exceeds this many points.
    pub max_spread_points: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_pct: 1.0,
            reward_ratio: 2.0,
            max_trades_per_day: 1,
            stop_placement: StopPlacement::OppositeSide,
            max_spread_points: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Venue dates with no session, on top of weekends.
    pub holidays: Vec<NaiveDate>,
    pub instrument: InstrumentSpec,
    pub session: SessionConfig,
    pub breakout: BreakoutConfig,
    pub trend: TrendConfig,
    pub volatility: VolatilityConfig,
    pub risk: RiskConfig,
    pub stops: StopConfig,
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a finite value >= 0, got {value}")))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a finite value > 0, got {value}")))
    }
}

impl EngineConfig {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self { instrument: InstrumentSpec::new(symbol), ..Self::default() }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn calendar(&self) -> HolidayCalendar {
        HolidayCalendar::new(self.holidays.iter().copied())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let inst = &self.instrument;
        if inst.symbol.trim().is_empty() {
            return Err(invalid("instrument.symbol", "must not be empty"));
        }
        non_negative("instrument.point", inst.point)?;
        positive("instrument.contract_size", inst.contract_size)?;
        positive("instrument.min_lot", inst.min_lot)?;
        positive("instrument.lot_step", inst.lot_step)?;
        positive("instrument.max_lot", inst.max_lot)?;
        if inst.max_lot < inst.min_lot {
            return Err(invalid(
                "instrument.max_lot",
                format!("{} is below min_lot {}", inst.max_lot, inst.min_lot),
            ));
        }
        non_negative("instrument.min_stop_distance", inst.min_stop_distance)?;

        SessionClock::new(&self.session)?;

        non_negative("breakout.buffer_fraction", self.breakout.buffer_fraction)?;
        let angle = self.breakout.min_angle_degrees;
        if !(angle.is_finite() && (0.0..90.0).contains(&angle)) {
            return Err(invalid("breakout.min_angle_degrees", format!("must be in [0, 90), got {angle}")));
        }

        if self.trend.lookback < 2 {
            return Err(invalid("trend.lookback", format!("must be >= 2, got {}", self.trend.lookback)));
        }
        let t = self.trend.threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(invalid("trend.threshold", format!("must be in (0, 1], got {t}")));
        }

        let vol = &self.volatility;
        non_negative("volatility.threshold_fraction", vol.threshold_fraction)?;
        if vol.max_samples == 0 {
            return Err(invalid("volatility.max_samples", "must be >= 1"));
        }
        if vol.recompute_interval_hours <= 0 {
            return Err(invalid("volatility.recompute_interval_hours", "must be >= 1"));
        }
        if vol.atr_period == 0 {
            return Err(invalid("volatility.atr_period", "must be >= 1"));
        }

        let risk = &self.risk;
        if !(risk.risk_pct > 0.0 && risk.risk_pct <= 100.0) {
            return Err(invalid("risk.risk_pct", format!("must be in (0, 100], got {}", risk.risk_pct)));
        }
        positive("risk.reward_ratio", risk.reward_ratio)?;
        if risk.max_trades_per_day == 0 {
            return Err(invalid("risk.max_trades_per_day", "must be >= 1"));
        }
        if let Some(spread) = risk.max_spread_points {
            positive("risk.max_spread_points", spread)?;
        }

        non_negative("stops.breakeven_trigger_fraction", self.stops.breakeven_trigger_fraction)?;
        non_negative("stops.trailing_start_fraction", self.stops.trailing_start_fraction)?;
        non_negative("stops.trailing_distance_fraction", self.stops.trailing_distance_fraction)?;
        non_negative("stops.trailing_step_fraction", self.stops.trailing_step_fraction)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionPreset, TradingCalendar};

    const SAMPLE: &str = r#"
holidays = ["2024-12-25"]

[instrument]
symbol = "US30"
point = 0.1
min_stop_distance = 2.0

[session]
preset = "early_open"
venue_offset_hours = 7
range_minutes = 15
allow_after_hours = true

[breakout]
buffer_fraction = 0.2
min_angle_degrees = 75.0

[risk]
risk_pct = 0.5
stop_placement = "midpoint"
max_spread_points = 30.0

[stops]
trailing_distance_fraction = 0.0
"#;

    #[test]
    fn parses_sample() {
        let cfg = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.instrument.symbol, "US30");
        assert_eq!(cfg.instrument.min_lot, 0.01);
        assert_eq!(cfg.session.preset, SessionPreset::EarlyOpen);
        assert_eq!(cfg.session.range_minutes, 15);
        assert_eq!(cfg.session.close_hour, 16);
        assert_eq!(cfg.breakout.min_angle_degrees, 75.0);
        assert_eq!(cfg.trend, TrendConfig::default());
        assert_eq!(cfg.risk.stop_placement, StopPlacement::Midpoint);
        assert_eq!(cfg.risk.max_spread_points, Some(30.0));
        assert_eq!(cfg.risk.reward_ratio, 2.0);
        assert_eq!(cfg.stops.trailing_distance_fraction, 0.0);
        assert_eq!(cfg.stops.breakeven_trigger_fraction, 0.5);

        let cal = cfg.calendar();
        assert!(!cal.is_trading_day(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
        assert!(cal.is_trading_day(NaiveDate::from_ymd_opt(2024, 12, 24).unwrap()));
    }

    #[test]
    fn custom_preset() {
        let cfg = EngineConfig::from_toml_str(
            "[instrument]\nsymbol = \"DE40\"\n[session]\npreset = { custom = { hour = 9, minute = 0 } }\n",
        )
        .unwrap();
        assert_eq!(cfg.session.preset, SessionPreset::Custom { hour: 9, minute: 0 });
    }

    #[test]
    fn toml_round_trip() {
        let cfg = EngineConfig::from_toml_str(SAMPLE).unwrap();
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_symbol_rejected() {
        let err = EngineConfig::from_toml_str("[risk]\nrisk_pct = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "instrument.symbol", .. }));
    }

    #[test]
    fn rejects_degenerate_values() {
        let mut cfg = EngineConfig::for_symbol("XAUUSD");
        cfg.validate().unwrap();

        cfg.risk.risk_pct = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "risk.risk_pct", .. })));
        cfg.risk.risk_pct = 1.0;

        cfg.trend.lookback = 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "trend.lookback", .. })));
        cfg.trend.lookback = 10;

        cfg.instrument.max_lot = 0.001;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "instrument.max_lot", .. })));
        cfg.instrument.max_lot = 100.0;

        cfg.stops.trailing_step_fraction = f64::NAN;
        assert!(cfg.validate().is_err());
        cfg.stops.trailing_step_fraction = 0.1;

        cfg.session.range_minutes = 7 * 60;
        assert!(matches!(cfg.validate(), Err(ConfigError::Session(ClockError::RangeOverrunsClose { .. }))));
    }

    #[test]
    fn shipped_config_is_valid() {
        let cfg = EngineConfig::from_toml_str(include_str!("../../configs/us30.toml")).unwrap();
        assert_eq!(cfg.session.venue_offset_hours, 7);
        assert_eq!(cfg.holidays.len(), 4);
        assert_eq!(cfg.risk.max_spread_points, Some(40.0));
    }

    #[test]
    fn unreadable_file() {
        let err = EngineConfig::from_toml_file(Path::new("/nonexistent/orb.toml")).unwrap_err();
        assert!(err.to_string().starts_with("read config /nonexistent/orb.toml"));
    }
}
