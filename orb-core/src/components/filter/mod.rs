//! Session filters: gate trade admission on market conditions.

pub mod volatility;

pub use volatility::{VolatilityConfig, VolatilityGate};

use serde::{Deserialize, Serialize};

/// Outcome of a filter evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterVerdict {
    Passed,
    /// Too little history to judge; admission allowed.
    PassedInsufficientHistory,
    /// No current reading to judge; admission allowed.
    PassedNoReading,
    /// Filter switched off in configuration.
    Disabled,
    FilteredByVolatility,
}

impl FilterVerdict {
    pub fn is_passed(&self) -> bool {
        !matches!(self, Self::FilteredByVolatility)
    }
}

/// Verdict plus the state it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterEvaluation {
    pub verdict: FilterVerdict,
    pub current: Option<f64>,
    pub median: Option<f64>,
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_verdict_is_passed() {
        assert!(FilterVerdict::Passed.is_passed());
        assert!(FilterVerdict::PassedInsufficientHistory.is_passed());
        assert!(FilterVerdict::PassedNoReading.is_passed());
        assert!(FilterVerdict::Disabled.is_passed());
        assert!(!FilterVerdict::FilteredByVolatility.is_passed());
    }
}
