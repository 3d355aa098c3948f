//! In-memory paper broker.
//!
//! Fills market orders at the requested price, resolves stop and target hits
//! on every quote update (bid for longs, ask for shorts), enforces the broker
//! minimum stop distance, and can be primed to reject submissions for
//! exercising the retry path.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Broker, BrokerError, OrderConfirmation, OrderRequest};
use crate::domain::{Direction, Ticket};

/// How a paper position ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Stop,
    Target,
    Market,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub ticket: Ticket,
    pub direction: Direction,
    pub volume: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub reason: CloseReason,
    pub closed_at: Option<NaiveDateTime>,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct PaperPosition {
    direction: Direction,
    volume: f64,
    entry_price: f64,
    stop: f64,
    target: f64,
}

#[derive(Debug, Clone)]
pub struct PaperBroker {
    equity: f64,
    /// Account value of a 1.0 price move on one lot.
    contract_value: f64,
    min_stop_distance: f64,
    bid: f64,
    ask: f64,
    now: Option<NaiveDateTime>,
    positions: BTreeMap<Ticket, PaperPosition>,
    closed: Vec<ClosedTrade>,
    next_ticket: u64,
    reject_next: usize,
}

impl PaperBroker {
    pub fn new(equity: f64) -> Self {
        Self {
            equity,
            contract_value: 1.0,
            min_stop_distance: 0.0,
            bid: 0.0,
            ask: 0.0,
            now: None,
            positions: BTreeMap::new(),
            closed: Vec::new(),
            next_ticket: 1,
            reject_next: 0,
        }
    }

    pub fn with_min_stop_distance(mut self, distance: f64) -> Self {
        self.min_stop_distance = distance.max(0.0);
        self
    }

    pub fn with_contract_value(mut self, value: f64) -> Self {
        self.contract_value = value;
        self
    }

    /// Reject the next `n` order submissions.
    pub fn reject_next(&mut self, n: usize) {
        self.reject_next = n;
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn stop_of(&self, ticket: Ticket) -> Option<f64> {
        self.positions.get(&ticket).map(|p| p.stop)
    }

    /// Update the quote and settle any stop or target it touches.
    /// Returns the trades closed by this update.
    pub fn set_quote(&mut self, now: NaiveDateTime, bid: f64, ask: f64) -> Vec<ClosedTrade> {
        self.now = Some(now);
        self.bid = bid;
        self.ask = ask;

        let hits: Vec<(Ticket, f64, CloseReason)> = self
            .positions
            .iter()
            .filter_map(|(ticket, p)| {
                let (stop_hit, target_hit) = match p.direction {
                    Direction::Long => (bid <= p.stop, bid >= p.target),
                    Direction::Short => (ask >= p.stop, ask <= p.target),
                };
                if stop_hit {
                    Some((*ticket, p.stop, CloseReason::Stop))
                } else if target_hit {
                    Some((*ticket, p.target, CloseReason::Target))
                } else {
                    None
                }
            })
            .collect();

        hits.into_iter()
            .filter_map(|(ticket, price, reason)| self.settle(ticket, price, reason))
            .collect()
    }

    fn market_exit(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long => self.bid,
            Direction::Short => self.ask,
        }
    }

    fn settle(&mut self, ticket: Ticket, exit_price: f64, reason: CloseReason) -> Option<ClosedTrade> {
        let p = self.positions.remove(&ticket)?;
        let pnl = (exit_price - p.entry_price) * p.direction.sign() * p.volume * self.contract_value;
        self.equity += pnl;
        let trade = ClosedTrade {
            ticket,
            direction: p.direction,
            volume: p.volume,
            entry_price: p.entry_price,
            exit_price,
            reason,
            closed_at: self.now,
            pnl,
        };
        info!(%ticket, ?reason, exit_price, pnl, "paper position closed");
        self.closed.push(trade.clone());
        Some(trade)
    }

    fn check_stop(&self, direction: Direction, price: f64, stop: f64) -> Result<(), BrokerError> {
        let distance = (price - stop) * direction.sign();
        if !stop.is_finite() || distance <= 0.0 || distance < self.min_stop_distance {
            return Err(BrokerError::InvalidStops {
                price,
                stop,
                min_distance: self.min_stop_distance,
            });
        }
        Ok(())
    }
}

impl Broker for PaperBroker {
    fn equity(&self) -> Result<f64, BrokerError> {
        Ok(self.equity)
    }

    fn submit(&mut self, order: &OrderRequest) -> Result<OrderConfirmation, BrokerError> {
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return Err(BrokerError::Rejected("requote".into()));
        }
        if !(order.volume.is_finite() && order.volume > 0.0) {
            return Err(BrokerError::InvalidVolume(order.volume));
        }
        self.check_stop(order.direction, order.price, order.stop)?;

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.positions.insert(
            ticket,
            PaperPosition {
                direction: order.direction,
                volume: order.volume,
                entry_price: order.price,
                stop: order.stop,
                target: order.target,
            },
        );
        Ok(OrderConfirmation { ticket, fill_price: order.price, volume: order.volume })
    }

    fn modify_stop(&mut self, ticket: Ticket, stop: f64) -> Result<(), BrokerError> {
        let direction = self
            .positions
            .get(&ticket)
            .map(|p| p.direction)
            .ok_or(BrokerError::UnknownTicket(ticket))?;
        self.check_stop(direction, self.market_exit(direction), stop)?;
        if let Some(p) = self.positions.get_mut(&ticket) {
            p.stop = stop;
        }
        Ok(())
    }

    fn is_open(&self, ticket: Ticket) -> Result<bool, BrokerError> {
        Ok(self.positions.contains_key(&ticket))
    }

    fn close(&mut self, ticket: Ticket) -> Result<f64, BrokerError> {
        let direction = self
            .positions
            .get(&ticket)
            .map(|p| p.direction)
            .ok_or(BrokerError::UnknownTicket(ticket))?;
        let price = self.market_exit(direction);
        self.settle(ticket, price, CloseReason::Market);
        Ok(price)
    }
}
