use chrono::{TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::MarketData;
use crate::config::BinanceConfig;
use crate::error::VenueError;
use crate::models::{Candle, Quote, Timeframe};

/// Binance caps a klines request at 1000 bars
const MAX_KLINES: usize = 1000;

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    status: String,
}

/// Response from /api/v3/ticker/bookTicker
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTicker {
    bid_price: String,
    ask_price: String,
}

/// Public market-data client for the Binance spot REST API
///
/// All requests share one rate limiter; `reconnect` rebuilds the HTTP client and
/// probes `/api/v3/ping`.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    rate_limiter: Arc<BinanceRateLimiter>,
}

impl BinanceClient {
    pub fn new(config: &BinanceConfig) -> Result<Self, VenueError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(rpm);

        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, VenueError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VenueError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

fn build_client(timeout: Duration) -> Result<Client, VenueError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn parse_number(value: &Value, field: &str) -> Result<f64, VenueError> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| VenueError::Decode(format!("{}: {}", field, e))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| VenueError::Decode(format!("{}: not a float", field))),
        other => Err(VenueError::Decode(format!(
            "{}: unexpected value {}",
            field, other
        ))),
    }
}

/// Convert one kline row `[open_time, open, high, low, close, volume, ...]`
fn parse_kline(row: &[Value]) -> Result<Candle, VenueError> {
    if row.len() < 6 {
        return Err(VenueError::Decode(format!(
            "kline row has {} fields",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| VenueError::Decode("kline open time".to_string()))?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .ok_or_else(|| VenueError::Decode(format!("invalid timestamp {}", open_time)))?;

    Ok(Candle {
        timestamp,
        open: parse_number(&row[1], "open")?,
        high: parse_number(&row[2], "high")?,
        low: parse_number(&row[3], "low")?,
        close: parse_number(&row[4], "close")?,
        volume: parse_number(&row[5], "volume")?,
    })
}

impl MarketData for BinanceClient {
    async fn select_symbol(&mut self, symbol: &str) -> Result<(), VenueError> {
        let result = self
            .get("/api/v3/exchangeInfo", &[("symbol", symbol.to_string())])
            .await;

        let info: ExchangeInfo = match result {
            Ok(response) => response.json().await?,
            // Binance answers 400 for symbols it does not list
            Err(VenueError::Status { status: 400, .. }) => {
                return Err(VenueError::UnknownSymbol(symbol.to_string()))
            }
            Err(e) => return Err(e),
        };

        match info.symbols.iter().find(|s| s.symbol == symbol) {
            Some(s) if s.status == "TRADING" => {
                tracing::info!("Symbol {} selected", symbol);
                Ok(())
            }
            Some(s) => Err(VenueError::Unavailable(format!(
                "{} is not trading (status {})",
                symbol, s.status
            ))),
            None => Err(VenueError::UnknownSymbol(symbol.to_string())),
        }
    }

    async fn fetch_recent_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, VenueError> {
        let limit = count.clamp(1, MAX_KLINES);
        let rows: Vec<Vec<Value>> = self
            .get(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?
            .json()
            .await?;

        let candles = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            symbol,
            timeframe = %timeframe,
            count = candles.len(),
            "Fetched candles"
        );

        Ok(candles)
    }

    async fn latest_quote(&mut self, symbol: &str) -> Result<Quote, VenueError> {
        let ticker: BookTicker = self
            .get("/api/v3/ticker/bookTicker", &[("symbol", symbol.to_string())])
            .await?
            .json()
            .await?;

        let bid = ticker
            .bid_price
            .parse::<f64>()
            .map_err(|e| VenueError::Decode(format!("bidPrice: {}", e)))?;
        let ask = ticker
            .ask_price
            .parse::<f64>()
            .map_err(|e| VenueError::Decode(format!("askPrice: {}", e)))?;

        Ok(Quote { bid, ask })
    }

    async fn reconnect(&mut self) -> Result<(), VenueError> {
        self.client = build_client(self.timeout)?;
        self.get("/api/v3/ping", &[]).await?;
        tracing::info!("Reconnected to {}", self.base_url);
        Ok(())
    }
}
