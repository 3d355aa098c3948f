use serde::{Deserialize, Serialize};

/// Price rounding policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TickPolicy {
    /// Round to nearest point
    RoundNearest,
    /// Round down
    RoundDown,
    /// Round up
    RoundUp,
}

/// Value-per-point convention the sizer applies to an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Currency pair quoted to 5 digits (point = 0.00001).
    Forex,
    /// Yen-quoted currency pair (point = 0.001).
    ForexJpy,
    /// Gold/silver CFDs, fixed $1 per point per lot.
    Metal,
    /// Index CFDs, fixed $1 per point per lot.
    Index,
    /// Anything else: sized from the broker's tick value / tick size.
    Other,
}

const METAL_PREFIXES: [&str; 4] = ["XAU", "XAG", "XPT", "XPD"];
const INDEX_NAMES: [&str; 12] = [
    "US30", "US100", "US500", "NAS100", "SPX500", "USTEC", "DJ30", "GER40", "DE40", "UK100",
    "JP225", "FRA40",
];

impl InstrumentKind {
    /// Classify a broker symbol. Suffixes such as `.m` or `-ECN` are ignored.
    pub fn infer(symbol: &str) -> Self {
        let upper = symbol.to_ascii_uppercase();
        let core: String = upper.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();

        if METAL_PREFIXES.iter().any(|p| core.starts_with(p)) {
            return Self::Metal;
        }
        if INDEX_NAMES.iter().any(|n| core.starts_with(n)) {
            return Self::Index;
        }
        if core.len() == 6 && core.chars().all(|c| c.is_ascii_alphabetic()) {
            return if core.ends_with("JPY") { Self::ForexJpy } else { Self::Forex };
        }
        Self::Other
    }

    /// Default minimal price increment when the broker does not report one.
    pub fn default_point(self) -> f64 {
        match self {
            Self::Forex => 0.00001,
            Self::ForexJpy => 0.001,
            Self::Metal | Self::Index | Self::Other => 0.01,
        }
    }
}

/// Broker metadata for a tradable instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Explicit convention; inferred from the symbol when absent.
    pub kind: Option<InstrumentKind>,
    /// Minimal price increment ("point").
    pub point: f64,
    /// Units per lot (100 000 for standard FX lots).
    pub contract_size: f64,
    /// Account-currency value of one `tick_size` move for one lot.
    pub tick_value: f64,
    pub tick_size: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub lot_step: f64,
    /// Minimum distance between market price and a stop, in price units.
    pub min_stop_distance: f64,
}

impl Default for InstrumentSpec {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            kind: None,
            point: 0.0,
            contract_size: 100_000.0,
            tick_value: 1.0,
            tick_size: 0.01,
            min_lot: 0.01,
            max_lot: 100.0,
            lot_step: 0.01,
            min_stop_distance: 0.0,
        }
    }
}

impl InstrumentSpec {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), ..Self::default() }
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind.unwrap_or_else(|| InstrumentKind::infer(&self.symbol))
    }

    /// Broker point, falling back to the convention's default increment.
    pub fn point(&self) -> f64 {
        if self.point > 0.0 {
            self.point
        } else {
            self.kind().default_point()
        }
    }

    /// Price distance expressed in points.
    pub fn to_points(&self, distance: f64) -> f64 {
        distance.abs() / self.point()
    }

    /// Round price to the instrument's point according to policy
    pub fn round_price(&self, price: f64, policy: TickPolicy) -> f64 {
        let point = self.point();
        let ticks = price / point;
        let rounded_ticks = match policy {
            TickPolicy::RoundNearest => ticks.round(),
            TickPolicy::RoundDown => (ticks + 1e-9).floor(),
            TickPolicy::RoundUp => (ticks - 1e-9).ceil(),
        };
        rounded_ticks * point
    }

    /// Round a lot quantity down to `lot_step`, then clamp to `max_lot`.
    pub fn round_lots_down(&self, lots: f64) -> f64 {
        if self.lot_step <= 0.0 {
            return lots.min(self.max_lot);
        }
        // 1e-9 absorbs representation error (2.0 / 0.1 = 19.999999999999996)
        let steps = (lots / self.lot_step + 1e-9).floor();
        let rounded = steps * self.lot_step;
        // Exact multiples may land an ulp above (3.0 * 0.1 = 0.30000000000000004)
        let rounded = if rounded > lots + lots.abs() * 1e-12 {
            (steps - 1.0).max(0.0) * self.lot_step
        } else {
            rounded
        };
        rounded.min(self.max_lot)
    }
}
