//! The session engine: one instance per traded instrument, one `evaluate` per tick.
//!
//! Each tick runs to completion in a fixed order:
//!
//! 1. Recompute the session from the clock and roll per-session state over
//!    when the venue date changes.
//! 2. Feed the volatility reading to the gate (in-session only).
//! 3. Reconcile the tracked position with the broker.
//! 4. Holiday pre-emption: liquidate and go `Idle` on a non-trading day.
//! 5. Run the current state: build or lock the range, look for an entry,
//!    manage stops, or force a close at the session boundary.
//!
//! Broker and data failures become a `Rejected`/`Skipped` evaluation and are
//! retried next tick. Position and trailing state change only after the
//! broker confirms.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use super::state::{Action, EngineError, Evaluation, SessionState, SkipReason};
use crate::broker::{Broker, MarketData, MarketSnapshot, OrderRequest};
use crate::components::{
    FilterEvaluation, OpeningRange, OrbSignal, PositionSizer, RangeTracker, SignalContext,
    SignalEvent, SignalSource, SizingRequest, StopManager, StopProposal, TrailingState,
    VolatilityGate,
};
use crate::config::{EngineConfig, StopPlacement};
use crate::domain::{Direction, Position, TickPolicy};
use crate::session::{Session, SessionClock, TradingCalendar};

pub struct SessionEngine<S: SignalSource = OrbSignal> {
    config: EngineConfig,
    clock: SessionClock,
    calendar: Box<dyn TradingCalendar + Send>,
    signal: S,
    tracker: RangeTracker,
    gate: VolatilityGate,
    sizer: PositionSizer,
    stops: StopManager,

    state: SessionState,
    session: Option<Session>,
    /// Open time of the newest bar folded into the range.
    range_cursor: Option<NaiveDateTime>,
    /// Volatility verdict taken when the range locked.
    lock_filter: Option<FilterEvaluation>,
    position: Option<Position>,
    trailing: Option<TrailingState>,
    trades_today: u32,
    after_hours_deadline: Option<NaiveDateTime>,
}

impl SessionEngine<OrbSignal> {
    /// Engine running the opening-range breakout signal configured in `config`.
    pub fn orb(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let signal = OrbSignal::new(&config.breakout, &config.trend);
        Self::new(config, signal)
    }
}

impl<S: SignalSource> SessionEngine<S> {
    pub fn new(config: EngineConfig, signal: S) -> Result<Self, EngineError> {
        config.validate()?;
        let clock = SessionClock::new(&config.session)?;
        Ok(Self {
            calendar: Box::new(config.calendar()),
            clock,
            signal,
            tracker: RangeTracker::new(),
            gate: VolatilityGate::new(config.volatility.clone()),
            sizer: PositionSizer::new(config.instrument.clone()),
            stops: StopManager::new(config.stops.clone()),
            state: SessionState::Idle,
            session: None,
            range_cursor: None,
            lock_filter: None,
            position: None,
            trailing: None,
            trades_today: 0,
            after_hours_deadline: None,
            config,
        })
    }

    /// Replace the configured holiday calendar.
    pub fn with_calendar(mut self, calendar: impl TradingCalendar + Send + 'static) -> Self {
        self.calendar = Box::new(calendar);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Frozen opening range for the current session.
    pub fn range(&self) -> Option<OpeningRange> {
        self.tracker.frozen()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trailing(&self) -> Option<&TrailingState> {
        self.trailing.as_ref()
    }

    pub fn trades_today(&self) -> u32 {
        self.trades_today
    }

    pub fn volatility_median(&self) -> Option<f64> {
        self.gate.cached_median()
    }

    pub fn lock_filter(&self) -> Option<&FilterEvaluation> {
        self.lock_filter.as_ref()
    }

    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// Process one tick.
    pub fn evaluate(
        &mut self,
        now: NaiveDateTime,
        snapshot: &MarketSnapshot,
        data: &dyn MarketData,
        broker: &mut dyn Broker,
    ) -> Result<Evaluation, EngineError> {
        let mut evaluation = self.step(now, snapshot, data, broker)?;
        evaluation.state = self.state;
        Ok(evaluation)
    }

    fn step(
        &mut self,
        now: NaiveDateTime,
        snapshot: &MarketSnapshot,
        data: &dyn MarketData,
        broker: &mut dyn Broker,
    ) -> Result<Evaluation, EngineError> {
        let session = self.clock.session_at(now, &*self.calendar)?;
        if self.session.map(|s| s.date) != Some(session.date) {
            self.start_session(session);
        }
        self.session = Some(session);

        if let Some(value) = snapshot.volatility {
            self.gate.record(now, value, session.within_hours(now));
        }

        if let Some(rejected) = self.sync_position(broker) {
            return Ok(rejected);
        }

        if !self.calendar.is_trading_day(self.clock.venue_date(now)) {
            return Ok(self.on_holiday(now, broker));
        }

        if self.state == SessionState::Idle {
            if session.in_formation(now) {
                self.transition(SessionState::BuildingRange, now);
            } else if session.within_hours(now) && now >= session.range_end {
                if self.trades_today >= self.config.risk.max_trades_per_day {
                    return Ok(Evaluation::skipped(SkipReason::DailyCapReached));
                }
                if self.tracker.is_frozen() {
                    self.transition(SessionState::RangeLocked, now);
                } else {
                    // Late start: rebuild the range from history before locking.
                    self.transition(SessionState::BuildingRange, now);
                }
            }
        }

        if self.state == SessionState::BuildingRange {
            if !session.within_hours(now) {
                self.transition(SessionState::Idle, now);
                return Ok(Evaluation::none());
            }
            if let Err(err) = self.ingest_range_bars(&session, data) {
                warn!(%err, "range bars unavailable");
                return Ok(Evaluation::skipped(SkipReason::DataUnavailable));
            }
            if session.in_formation(now) {
                return Ok(Evaluation::none());
            }
            if let Some(skipped) = self.lock_range(now, snapshot) {
                return Ok(skipped);
            }
        }

        match self.state {
            SessionState::RangeLocked => {
                if !session.within_hours(now) {
                    self.transition(SessionState::Idle, now);
                    return Ok(Evaluation::none());
                }
                self.try_admit(now, snapshot, data, broker)
            }
            SessionState::InPosition => {
                if session.within_hours(now) {
                    return Ok(self.manage_stop(snapshot, broker));
                }
                if self.config.session.allow_after_hours {
                    let lead = Duration::minutes(i64::from(self.config.session.close_before_next_minutes));
                    let deadline = session.next_start - lead;
                    self.after_hours_deadline = Some(deadline);
                    self.transition(SessionState::AfterHoursPosition, now);
                    info!(%deadline, "holding position after hours");
                    if now >= deadline {
                        return Ok(self.close_position(Action::CloseForSessionEnd, now, broker));
                    }
                    Ok(self.manage_stop(snapshot, broker))
                } else {
                    Ok(self.close_position(Action::CloseForSessionEnd, now, broker))
                }
            }
            SessionState::AfterHoursPosition => match self.after_hours_deadline {
                Some(deadline) if now < deadline => Ok(self.manage_stop(snapshot, broker)),
                _ => Ok(self.close_position(Action::CloseForSessionEnd, now, broker)),
            },
            SessionState::Idle | SessionState::BuildingRange => Ok(Evaluation::none()),
        }
    }

    fn transition(&mut self, to: SessionState, now: NaiveDateTime) {
        if self.state != to {
            info!(from = %self.state, %to, %now, "session state");
            self.state = to;
        }
    }

    fn start_session(&mut self, session: Session) {
        debug!(date = %session.date, start = %session.start, next_start = %session.next_start, "new session");
        self.tracker.reset();
        self.signal.on_session_start();
        self.range_cursor = None;
        self.lock_filter = None;
        self.trades_today = 0;
        if matches!(self.state, SessionState::BuildingRange | SessionState::RangeLocked) {
            self.state = SessionState::Idle;
        }
    }

    /// Drop the tracked position once the broker no longer reports it open.
    fn sync_position(&mut self, broker: &dyn Broker) -> Option<Evaluation> {
        let ticket = self.position.as_ref()?.ticket;
        match broker.is_open(ticket) {
            Ok(true) => None,
            Ok(false) => {
                info!(%ticket, "position closed by broker");
                self.position = None;
                self.trailing = None;
                self.after_hours_deadline = None;
                if self.state.has_position() {
                    self.state = SessionState::Idle;
                }
                None
            }
            Err(err) => {
                warn!(%ticket, %err, "position status unavailable");
                Some(Evaluation::rejected(Action::None, err))
            }
        }
    }

    fn on_holiday(&mut self, now: NaiveDateTime, broker: &mut dyn Broker) -> Evaluation {
        if self.position.is_some() {
            return self.close_position(Action::CloseForHoliday, now, broker);
        }
        self.transition(SessionState::Idle, now);
        Evaluation::none()
    }

    fn ingest_range_bars(
        &mut self,
        session: &Session,
        data: &dyn MarketData,
    ) -> Result<usize, crate::broker::DataError> {
        let bars = data.bars_since(session.start)?;
        let fresh: Vec<_> = bars
            .into_iter()
            .filter(|b| self.range_cursor.map_or(true, |cursor| b.time > cursor))
            .collect();
        if let Some(last) = fresh.last() {
            self.range_cursor = Some(last.time);
        }
        Ok(self.tracker.observe_window(&fresh, session))
    }

    fn lock_range(&mut self, now: NaiveDateTime, snapshot: &MarketSnapshot) -> Option<Evaluation> {
        let Some(range) = self.tracker.freeze() else {
            warn!(bars = self.tracker.bars_seen(), "formation window closed without a usable bar");
            return Some(Evaluation::skipped(SkipReason::RangeNotFormed));
        };
        info!(high = range.high, low = range.low, size = range.size(), "opening range locked");

        if self.lock_filter.is_none() {
            let filter = self.gate.evaluate(now, snapshot.volatility);
            if filter.verdict.is_passed() {
                debug!(verdict = ?filter.verdict, median = ?filter.median, "volatility gate passed");
            } else {
                info!(current = ?filter.current, median = ?filter.median, "volatility gate closed for the session");
            }
            self.lock_filter = Some(filter);
        }
        self.transition(SessionState::RangeLocked, now);
        None
    }

    fn try_admit(
        &mut self,
        now: NaiveDateTime,
        snapshot: &MarketSnapshot,
        data: &dyn MarketData,
        broker: &mut dyn Broker,
    ) -> Result<Evaluation, EngineError> {
        if self.lock_filter.is_some_and(|f| !f.verdict.is_passed()) {
            return Ok(Evaluation::skipped(SkipReason::VolatilityFiltered));
        }
        if self.trades_today >= self.config.risk.max_trades_per_day {
            return Ok(Evaluation::skipped(SkipReason::DailyCapReached));
        }
        if self.position.is_some() {
            return Ok(Evaluation::skipped(SkipReason::PositionOpen));
        }
        if !snapshot.is_valid() {
            return Ok(Evaluation::skipped(SkipReason::InvalidQuote));
        }
        if let Some(max_points) = self.config.risk.max_spread_points {
            let spread_points = self.config.instrument.to_points(snapshot.spread());
            if spread_points > max_points {
                debug!(spread_points, max_points, "spread too wide");
                return Ok(Evaluation::skipped(SkipReason::SpreadTooWide));
            }
        }
        let Some(range) = self.tracker.frozen() else {
            return Ok(Evaluation::skipped(SkipReason::RangeNotFormed));
        };

        let bars = match data.completed_bars(self.signal.closes_needed().max(1)) {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => return Ok(Evaluation::skipped(SkipReason::DataUnavailable)),
            Err(err) => {
                warn!(%err, "completed bars unavailable");
                return Ok(Evaluation::skipped(SkipReason::DataUnavailable));
            }
        };
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let ctx = SignalContext {
            now,
            bid: snapshot.bid,
            ask: snapshot.ask,
            last_close: closes[0],
            range: &range,
            closes: &closes,
        };
        let Some(event) = self.signal.evaluate(&ctx) else {
            return Ok(Evaluation::none());
        };
        info!(
            signal = self.signal.name(),
            direction = ?event.direction,
            strength = event.strength,
            "entry admitted"
        );
        self.open_position(now, &event, &range, snapshot, broker)
    }

    fn order_for(&self, direction: Direction, range: &OpeningRange, snapshot: &MarketSnapshot) -> OrderRequest {
        let spec = &self.config.instrument;
        let entry = match direction {
            Direction::Long => snapshot.ask,
            Direction::Short => snapshot.bid,
        };
        let mut stop = match (self.config.risk.stop_placement, direction) {
            (StopPlacement::OppositeSide, Direction::Long) => range.low,
            (StopPlacement::OppositeSide, Direction::Short) => range.high,
            (StopPlacement::Midpoint, _) => range.midpoint(),
        };
        let min_distance = spec.min_stop_distance.max(spec.point());
        if (entry - stop) * direction.sign() < min_distance {
            stop = entry - direction.sign() * min_distance;
        }
        // Round away from the entry so the broker minimum still holds.
        let stop = match direction {
            Direction::Long => spec.round_price(stop, TickPolicy::RoundDown),
            Direction::Short => spec.round_price(stop, TickPolicy::RoundUp),
        };
        let distance = (entry - stop).abs();
        let target = spec.round_price(
            entry + direction.sign() * distance * self.config.risk.reward_ratio,
            TickPolicy::RoundNearest,
        );
        OrderRequest { direction, volume: 0.0, price: entry, stop, target }
    }

    fn open_position(
        &mut self,
        now: NaiveDateTime,
        event: &SignalEvent,
        range: &OpeningRange,
        snapshot: &MarketSnapshot,
        broker: &mut dyn Broker,
    ) -> Result<Evaluation, EngineError> {
        let action = match event.direction {
            Direction::Long => Action::OpenLong,
            Direction::Short => Action::OpenShort,
        };
        let mut order = self.order_for(event.direction, range, snapshot);

        let equity = match broker.equity() {
            Ok(equity) => equity,
            Err(err) => {
                warn!(%err, "account equity unavailable");
                return Ok(Evaluation::rejected(action, err));
            }
        };
        let sized = self.sizer.size(&SizingRequest {
            equity,
            risk_pct: self.config.risk.risk_pct,
            entry: order.price,
            stop: order.stop,
            quote_rate: snapshot.quote_rate,
        })?;
        if sized.rounding_shortfall() > 0.0 {
            debug!(
                requested = sized.requested_risk,
                actual = sized.actual_risk,
                "lot rounding reduced risk"
            );
        }
        order.volume = sized.lots;

        let confirmation = match broker.submit(&order) {
            Ok(c) => c,
            Err(err) => {
                warn!(%err, ?action, price = order.price, stop = order.stop, "order rejected");
                return Ok(Evaluation::rejected(action, err));
            }
        };

        let position = Position {
            ticket: confirmation.ticket,
            direction: event.direction,
            volume: confirmation.volume,
            entry_price: confirmation.fill_price,
            stop_price: order.stop,
            target_price: order.target,
            opened_at: now,
        };
        info!(
            ticket = %position.ticket,
            ?action,
            volume = position.volume,
            entry = position.entry_price,
            stop = position.stop_price,
            target = position.target_price,
            risk = sized.actual_risk,
            "position opened"
        );
        self.trailing = Some(TrailingState::new(&position));
        self.position = Some(position);
        self.trades_today += 1;
        self.transition(SessionState::InPosition, now);
        Ok(Evaluation::done(action))
    }

    fn manage_stop(&mut self, snapshot: &MarketSnapshot, broker: &mut dyn Broker) -> Evaluation {
        let range_size = self.tracker.size();
        let (Some(position), Some(trailing)) = (self.position.as_mut(), self.trailing.as_mut()) else {
            return Evaluation::none();
        };
        let price = match position.direction {
            Direction::Long => snapshot.bid,
            Direction::Short => snapshot.ask,
        };
        let Some(proposal) = self.stops.on_price(trailing, position, price, range_size) else {
            return Evaluation::none();
        };
        let policy = match position.direction {
            Direction::Long => TickPolicy::RoundDown,
            Direction::Short => TickPolicy::RoundUp,
        };
        let proposal = StopProposal {
            stop: self.config.instrument.round_price(proposal.stop, policy),
            ..proposal
        };
        if !position.direction.improves(proposal.stop, position.stop_price) {
            return Evaluation::none();
        }

        match broker.modify_stop(position.ticket, proposal.stop) {
            Ok(()) => {
                let level = self.stops.commit(trailing, position, &proposal);
                info!(ticket = %position.ticket, stop = level, reason = ?proposal.reason, "stop moved");
                Evaluation::done(Action::ModifyStop)
            }
            Err(err) => {
                warn!(ticket = %position.ticket, %err, stop = proposal.stop, "stop modification rejected");
                Evaluation::rejected(Action::ModifyStop, err)
            }
        }
    }

    fn close_position(&mut self, action: Action, now: NaiveDateTime, broker: &mut dyn Broker) -> Evaluation {
        let Some(ticket) = self.position.as_ref().map(|p| p.ticket) else {
            self.transition(SessionState::Idle, now);
            return Evaluation::none();
        };
        match broker.close(ticket) {
            Ok(price) => {
                info!(%ticket, price, ?action, "position closed");
                self.position = None;
                self.trailing = None;
                self.after_hours_deadline = None;
                self.transition(SessionState::Idle, now);
                Evaluation::done(action)
            }
            Err(err) => {
                warn!(%ticket, %err, ?action, "close rejected");
                Evaluation::rejected(action, err)
            }
        }
    }
}
