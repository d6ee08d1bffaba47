use chrono::Utc;

use crate::api::{AccountSource, MarketData};
use crate::config::{InstrumentConfig, PaperConfig};
use crate::error::VenueError;
use crate::execution::ExecutionGateway;
use crate::models::{
    AccountSnapshot, Candle, EntryRequest, OrderResult, Quote, Side, StopModifyRequest, Timeframe,
};

const NO_POSITION: i64 = 10036;
const POSITION_EXISTS: i64 = 10040;
const INVALID_STOPS: i64 = 10016;
const INVALID_VOLUME: i64 = 10014;

#[derive(Debug, Clone)]
struct PaperPosition {
    ticket: u64,
    symbol: String,
    side: Side,
    size: f64,
    open_price: f64,
    stop_loss: f64,
    take_profit: f64,
}

/// Simulated account and order book on top of a live market-data feed
///
/// Fills happen at the requested price. Attached stops and targets are settled
/// whenever a fresh quote arrives, so a position can disappear between polls the
/// same way it would on a real venue.
pub struct PaperVenue<F> {
    feed: F,
    balance: f64,
    leverage: f64,
    point: f64,
    value_per_point: f64,
    next_ticket: u64,
    position: Option<PaperPosition>,
    last_quote: Option<Quote>,
}

impl<F: MarketData> PaperVenue<F> {
    pub fn new(feed: F, paper: &PaperConfig, instrument: &InstrumentConfig) -> Self {
        Self {
            feed,
            balance: paper.starting_balance,
            leverage: paper.leverage,
            point: instrument.point,
            value_per_point: instrument.value_per_point,
            next_ticket: 1,
            position: None,
            last_quote: None,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    /// Profit of `size` moved from `from` to `to` in the `side` direction
    fn pnl(&self, side: Side, size: f64, from: f64, to: f64) -> f64 {
        side.direction() * (to - from) / self.point * self.value_per_point * size
    }

    /// Units of the underlying in one lot, as implied by the per-point valuation
    fn units_per_lot(&self) -> f64 {
        self.value_per_point / self.point
    }

    fn unrealized(&self) -> f64 {
        match (&self.position, &self.last_quote) {
            (Some(p), Some(q)) => self.pnl(p.side, p.size, p.open_price, q.exit_price(p.side)),
            _ => 0.0,
        }
    }

    fn used_margin(&self) -> f64 {
        match &self.position {
            Some(p) if self.leverage > 0.0 => {
                p.size * self.units_per_lot() * p.open_price / self.leverage
            }
            _ => 0.0,
        }
    }

    fn realize(&mut self, exit_price: f64, why: &str) {
        let Some(position) = self.position.take() else {
            return;
        };
        let pnl = self.pnl(position.side, position.size, position.open_price, exit_price);
        self.balance += pnl;
        tracing::info!(
            ticket = position.ticket,
            exit_price,
            pnl,
            balance = self.balance,
            "Paper position closed by {}",
            why
        );
    }

    /// Close the open position if `quote` crosses its stop or target
    fn settle(&mut self, symbol: &str, quote: &Quote) {
        let Some(p) = self.position.as_ref().filter(|p| p.symbol == symbol) else {
            return;
        };
        let price = quote.exit_price(p.side);
        let (stop_hit, target_hit) = match p.side {
            Side::Long => (price <= p.stop_loss, price >= p.take_profit),
            Side::Short => (price >= p.stop_loss, price <= p.take_profit),
        };

        if stop_hit {
            let level = p.stop_loss;
            self.realize(level, "stop-loss");
        } else if target_hit {
            let level = p.take_profit;
            self.realize(level, "take-profit");
        }
    }
}

impl<F: MarketData> MarketData for PaperVenue<F> {
    async fn select_symbol(&mut self, symbol: &str) -> Result<(), VenueError> {
        self.feed.select_symbol(symbol).await
    }

    async fn fetch_recent_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, VenueError> {
        self.feed.fetch_recent_candles(symbol, timeframe, count).await
    }

    async fn latest_quote(&mut self, symbol: &str) -> Result<Quote, VenueError> {
        let quote = self.feed.latest_quote(symbol).await?;
        self.last_quote = Some(quote);
        self.settle(symbol, &quote);
        Ok(quote)
    }

    async fn reconnect(&mut self) -> Result<(), VenueError> {
        self.feed.reconnect().await
    }
}

impl<F: MarketData> AccountSource for PaperVenue<F> {
    async fn account_snapshot(&mut self) -> Result<AccountSnapshot, VenueError> {
        if let Some(symbol) = self.position.as_ref().map(|p| p.symbol.clone()) {
            self.latest_quote(&symbol).await?;
        }

        let equity = self.balance + self.unrealized();
        let used_margin = self.used_margin();
        let margin_level = if used_margin > 0.0 {
            equity / used_margin * 100.0
        } else {
            0.0
        };

        Ok(AccountSnapshot {
            balance: self.balance,
            equity,
            margin_level,
        })
    }
}

impl<F: MarketData> ExecutionGateway for PaperVenue<F> {
    async fn submit_entry(&mut self, request: &EntryRequest) -> Result<OrderResult, VenueError> {
        if self.position.is_some() {
            return Ok(OrderResult::rejected(POSITION_EXISTS, "Position already open"));
        }
        if request.size <= 0.0 {
            return Ok(OrderResult::rejected(INVALID_VOLUME, "Invalid volume"));
        }
        let stops_valid = match request.side {
            Side::Long => request.stop_loss < request.price && request.take_profit > request.price,
            Side::Short => request.stop_loss > request.price && request.take_profit < request.price,
        };
        if !stops_valid {
            return Ok(OrderResult::rejected(INVALID_STOPS, "Invalid stops"));
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.position = Some(PaperPosition {
            ticket,
            symbol: request.symbol.clone(),
            side: request.side,
            size: request.size,
            open_price: request.price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
        });

        tracing::info!(
            ticket,
            side = %request.side,
            size = request.size,
            price = request.price,
            opened_at = %Utc::now(),
            "Paper fill"
        );

        Ok(OrderResult::done(ticket))
    }

    async fn modify_stop_loss(
        &mut self,
        request: &StopModifyRequest,
    ) -> Result<OrderResult, VenueError> {
        match self.position.as_mut() {
            Some(p) if p.ticket == request.ticket => {
                p.stop_loss = request.stop_loss;
                p.take_profit = request.take_profit;
                Ok(OrderResult::done(p.ticket))
            }
            _ => Ok(OrderResult::rejected(NO_POSITION, "Position doesn't exist")),
        }
    }

    async fn close_all(&mut self, symbol: &str) -> Result<OrderResult, VenueError> {
        let Some(ticket) = self
            .position
            .as_ref()
            .filter(|p| p.symbol == symbol)
            .map(|p| p.ticket)
        else {
            return Ok(OrderResult::rejected(NO_POSITION, "No open positions"));
        };

        let quote = self.feed.latest_quote(symbol).await?;
        self.last_quote = Some(quote);
        if let Some(side) = self.position.as_ref().map(|p| p.side) {
            self.realize(quote.exit_price(side), "close request");
        }
        Ok(OrderResult::done(ticket))
    }

    async fn is_position_open(&mut self, ticket: u64) -> Result<bool, VenueError> {
        if let Some(symbol) = self.position.as_ref().map(|p| p.symbol.clone()) {
            self.latest_quote(&symbol).await?;
        }
        Ok(self.position.as_ref().is_some_and(|p| p.ticket == ticket))
    }
}
