pub mod binance;
pub mod telegram;

pub use binance::BinanceClient;
pub use telegram::TelegramNotifier;

use crate::error::VenueError;
use crate::models::{AccountSnapshot, Candle, Quote, Timeframe};

/// Market-data side of a venue connection
#[allow(async_fn_in_trait)]
pub trait MarketData {
    /// Make `symbol` available for trading; fails if the venue does not list it
    async fn select_symbol(&mut self, symbol: &str) -> Result<(), VenueError>;

    /// Most recent `count` candles, oldest first
    async fn fetch_recent_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, VenueError>;

    async fn latest_quote(&mut self, symbol: &str) -> Result<Quote, VenueError>;

    /// Tear down and re-establish the connection
    async fn reconnect(&mut self) -> Result<(), VenueError>;
}

/// Account figures as reported by the venue
#[allow(async_fn_in_trait)]
pub trait AccountSource {
    async fn account_snapshot(&mut self) -> Result<AccountSnapshot, VenueError>;
}
