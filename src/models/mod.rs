use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar period used for candle requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Interval code as used by exchange kline endpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator values for one timeframe at one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub atr: f64,
    pub adx: f64,
    pub rsi: f64,
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Entry side for a directional signal
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Buy => Some(Side::Long),
            Signal::Sell => Some(Side::Short),
            Signal::Hold => None,
        }
    }
}

/// Account figures reported by the venue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    /// Equity / used margin * 100. Zero when no margin is in use.
    pub margin_level: f64,
}

/// Top of book
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    /// Price at which a new position on `side` is filled
    pub fn entry_price(&self, side: Side) -> f64 {
        match side {
            Side::Long => self.ask,
            Side::Short => self.bid,
        }
    }

    /// Price at which an open position on `side` is marked and closed
    pub fn exit_price(&self, side: Side) -> f64 {
        match side {
            Side::Long => self.bid,
            Side::Short => self.ask,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn direction(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("BUY"),
            Side::Short => f.write_str("SELL"),
        }
    }
}

/// The single open position
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub size: f64,
    pub open_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub ticket: u64,
    pub opened_at: DateTime<Utc>,
}

/// Market order opening a position with attached stop-loss and take-profit
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRequest {
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Stop-loss change for an open ticket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopModifyRequest {
    pub ticket: u64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Done,
    Rejected { code: i64, comment: String },
}

/// Venue answer to an order request
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub status: OrderStatus,
    pub ticket: Option<u64>,
}

impl OrderResult {
    pub fn done(ticket: u64) -> Self {
        Self {
            status: OrderStatus::Done,
            ticket: Some(ticket),
        }
    }

    pub fn rejected(code: i64, comment: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::Rejected {
                code,
                comment: comment.into(),
            },
            ticket: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == OrderStatus::Done
    }
}
