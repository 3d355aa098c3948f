//! Opening-range breakout signal: a `BreakoutDetector` driven by the mid price.

use std::collections::HashMap;

use tracing::debug;

use super::{SignalContext, SignalEvent, SignalSource};
use crate::components::breakout::{
    BreakoutConfig, BreakoutDecision, BreakoutDetector, BreakoutInput, BreakoutTrack,
};
use crate::components::trend::TrendConfig;

#[derive(Debug, Clone)]
pub struct OrbSignal {
    detector: BreakoutDetector,
    last_decision: Option<BreakoutDecision>,
}

impl OrbSignal {
    pub fn new(breakout: &BreakoutConfig, trend: &TrendConfig) -> Self {
        Self { detector: BreakoutDetector::new(breakout, trend), last_decision: None }
    }

    pub fn last_decision(&self) -> Option<&BreakoutDecision> {
        self.last_decision.as_ref()
    }

    pub fn track(&self) -> Option<&BreakoutTrack> {
        self.detector.track()
    }
}

impl SignalSource for OrbSignal {
    fn name(&self) -> &str {
        "orb_breakout"
    }

    fn closes_needed(&self) -> usize {
        self.detector.aligner().closes_needed()
    }

    fn on_session_start(&mut self) {
        self.detector.reset();
        self.last_decision = None;
    }

    fn evaluate(&mut self, ctx: &SignalContext<'_>) -> Option<SignalEvent> {
        let decision = self.detector.evaluate(&BreakoutInput {
            now: ctx.now,
            price: ctx.mid(),
            last_close: ctx.last_close,
            range: ctx.range,
            closes: ctx.closes,
        });
        if !matches!(decision, BreakoutDecision::NoCandidate) {
            debug!(?decision, price = ctx.mid(), "breakout evaluation");
        }
        self.last_decision = Some(decision);

        let admission = decision.admission()?;
        let mut metadata = HashMap::new();
        metadata.insert("breakout_level".into(), admission.level);
        metadata.insert("reference_price".into(), ctx.mid());
        metadata.insert("trend_fraction".into(), admission.trend_fraction);
        if let Some(angle) = admission.angle_degrees {
            metadata.insert("angle_degrees".into(), angle);
        }

        Some(SignalEvent {
            time: ctx.now,
            direction: admission.direction,
            strength: admission.trend_fraction,
            metadata,
        })
    }
}
