//! Broker and market-data ports, plus structured error types.
//!
//! The engine talks to the outside world only through these two traits so a
//! live adapter, a replay harness and the in-memory paper broker are
//! interchangeable. Every call may fail; the engine reports the failure on the
//! current tick and tries again on the next one.

pub mod history;
pub mod paper;

pub use history::BarHistory;
pub use paper::{ClosedTrade, CloseReason, PaperBroker};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Direction, Ticket};

/// Structured market-data failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("market data feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("no completed bars available")]
    NoBars,
}

/// Structured order-routing failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BrokerError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("invalid stops: stop {stop} is closer than {min_distance} to {price}")]
    InvalidStops { price: f64, stop: f64, min_distance: f64 },

    #[error("invalid volume {0}")]
    InvalidVolume(f64),

    #[error("market closed")]
    MarketClosed,

    #[error("position {0} not found")]
    UnknownTicket(Ticket),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Market order with protective stop and target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub direction: Direction,
    pub volume: f64,
    /// Expected fill: ask for longs, bid for shorts.
    pub price: f64,
    pub stop: f64,
    pub target: f64,
}

/// Broker acknowledgement of a filled market order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub ticket: Ticket,
    pub fill_price: f64,
    pub volume: f64,
}

/// Per-tick quote and indicator readings handed to the engine by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub bid: f64,
    pub ask: f64,
    /// Volatility indicator reading (ATR) for the gate, if the host has one.
    pub volatility: Option<f64>,
    /// Quote-to-account currency conversion for sizing.
    pub quote_rate: Option<f64>,
}

impl MarketSnapshot {
    pub fn new(bid: f64, ask: f64) -> Self {
        Self { bid, ask, volatility: None, quote_rate: None }
    }

    pub fn with_volatility(mut self, value: f64) -> Self {
        self.volatility = Some(value);
        self
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Finite, positive and not crossed.
    pub fn is_valid(&self) -> bool {
        self.bid.is_finite() && self.ask.is_finite() && self.bid > 0.0 && self.ask >= self.bid
    }
}

/// Order execution and account queries.
pub trait Broker {
    fn equity(&self) -> Result<f64, BrokerError>;

    /// Submit a market order. On `Err` no position exists.
    fn submit(&mut self, order: &OrderRequest) -> Result<OrderConfirmation, BrokerError>;

    fn modify_stop(&mut self, ticket: Ticket, stop: f64) -> Result<(), BrokerError>;

    fn is_open(&self, ticket: Ticket) -> Result<bool, BrokerError>;

    /// Close at market; returns the exit price.
    fn close(&mut self, ticket: Ticket) -> Result<f64, BrokerError>;
}

/// Completed-bar history.
pub trait MarketData {
    /// Up to `count` most recent completed bars, newest first.
    fn completed_bars(&self, count: usize) -> Result<Vec<Bar>, DataError>;

    /// Completed bars opened at or after `since`, oldest first.
    fn bars_since(&self, since: NaiveDateTime) -> Result<Vec<Bar>, DataError>;
}
