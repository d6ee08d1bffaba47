use std::time::Duration;

use crate::api::{AccountSource, MarketData};
use crate::config::SchedulerConfig;
use crate::error::{FatalError, VenueError};
use crate::execution::ExecutionGateway;
use crate::models::{AccountSnapshot, Candle, Quote, Timeframe};

/// Retry and reconnect budgets for venue reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub reconnect_attempts: u32,
}

impl From<&SchedulerConfig> for RetryPolicy {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            delay: config.retry_delay(),
            reconnect_attempts: config.reconnect_attempts.max(1),
        }
    }
}

/// A read-only venue request that can be repeated safely
#[allow(async_fn_in_trait)]
pub trait VenueRead<V> {
    type Output;

    fn describe(&self) -> String;

    async fn read(&self, venue: &mut V) -> Result<Self::Output, VenueError>;
}

pub struct ReadAccount;

impl<V: AccountSource> VenueRead<V> for ReadAccount {
    type Output = AccountSnapshot;

    fn describe(&self) -> String {
        "account snapshot".to_string()
    }

    async fn read(&self, venue: &mut V) -> Result<AccountSnapshot, VenueError> {
        venue.account_snapshot().await
    }
}

pub struct ReadCandles<'a> {
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    pub count: usize,
}

impl<V: MarketData> VenueRead<V> for ReadCandles<'_> {
    type Output = Vec<Candle>;

    fn describe(&self) -> String {
        format!("{} {} candles", self.symbol, self.timeframe)
    }

    async fn read(&self, venue: &mut V) -> Result<Vec<Candle>, VenueError> {
        venue
            .fetch_recent_candles(self.symbol, self.timeframe, self.count)
            .await
    }
}

pub struct ReadQuote<'a> {
    pub symbol: &'a str,
}

impl<V: MarketData> VenueRead<V> for ReadQuote<'_> {
    type Output = Quote;

    fn describe(&self) -> String {
        format!("{} quote", self.symbol)
    }

    async fn read(&self, venue: &mut V) -> Result<Quote, VenueError> {
        venue.latest_quote(self.symbol).await
    }
}

pub struct ReadTicketOpen {
    pub ticket: u64,
}

impl<V: ExecutionGateway> VenueRead<V> for ReadTicketOpen {
    type Output = bool;

    fn describe(&self) -> String {
        format!("status of ticket {}", self.ticket)
    }

    async fn read(&self, venue: &mut V) -> Result<bool, VenueError> {
        venue.is_position_open(self.ticket).await
    }
}

/// Run `request` with one round of retries, a reconnect, then one more round
///
/// `Ok(None)` means both rounds failed and the caller should give up on this cycle.
/// A reconnect that exhausts its budget is fatal.
pub async fn with_retry<V, R>(
    venue: &mut V,
    policy: &RetryPolicy,
    request: &R,
) -> Result<Option<R::Output>, FatalError>
where
    V: MarketData,
    R: VenueRead<V>,
{
    let error = match retry_round(venue, policy, request).await {
        Ok(value) => return Ok(Some(value)),
        Err(e) => e,
    };

    tracing::warn!(
        "{} failed after {} attempts ({}), reconnecting",
        request.describe(),
        policy.attempts,
        error
    );
    reconnect(venue, policy, &request.describe()).await?;

    match retry_round(venue, policy, request).await {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(
                "{} still failing after reconnect ({}), abandoning cycle",
                request.describe(),
                e
            );
            Ok(None)
        }
    }
}

async fn retry_round<V, R>(
    venue: &mut V,
    policy: &RetryPolicy,
    request: &R,
) -> Result<R::Output, VenueError>
where
    R: VenueRead<V>,
{
    let mut attempt = 1;
    loop {
        match request.read(venue).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "{} failed: {}, retrying in {:?} (attempt {}/{})",
                    request.describe(),
                    e,
                    policy.delay,
                    attempt,
                    policy.attempts
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

async fn reconnect<V: MarketData>(
    venue: &mut V,
    policy: &RetryPolicy,
    operation: &str,
) -> Result<(), FatalError> {
    let mut attempt = 1;
    loop {
        match venue.reconnect().await {
            Ok(()) => {
                tracing::info!("Reconnected on attempt {}", attempt);
                return Ok(());
            }
            Err(e) if attempt >= policy.reconnect_attempts => {
                return Err(FatalError::ReconnectExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(
                    "Reconnect failed: {} (attempt {}/{})",
                    e,
                    attempt,
                    policy.reconnect_attempts
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quote feed that fails a set number of times and can refuse reconnects
    struct FlakyFeed {
        failures_left: u32,
        reads: u32,
        reconnects: u32,
        reconnect_ok: bool,
    }

    impl FlakyFeed {
        fn failing(failures: u32) -> Self {
            Self {
                failures_left: failures,
                reads: 0,
                reconnects: 0,
                reconnect_ok: true,
            }
        }
    }

    impl MarketData for FlakyFeed {
        async fn select_symbol(&mut self, _: &str) -> Result<(), VenueError> {
            Ok(())
        }

        async fn fetch_recent_candles(
            &mut self,
            _: &str,
            _: Timeframe,
            _: usize,
        ) -> Result<Vec<Candle>, VenueError> {
            Ok(Vec::new())
        }

        async fn latest_quote(&mut self, _: &str) -> Result<Quote, VenueError> {
            self.reads += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(VenueError::Unavailable("down".to_string()));
            }
            Ok(Quote { bid: 1.0, ask: 1.1 })
        }

        async fn reconnect(&mut self) -> Result<(), VenueError> {
            self.reconnects += 1;
            if self.reconnect_ok {
                Ok(())
            } else {
                Err(VenueError::Unavailable("no route".to_string()))
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::ZERO,
            reconnect_attempts: 2,
        }
    }

    const QUOTE: ReadQuote<'static> = ReadQuote { symbol: "BTCUSDT" };

    #[tokio::test]
    async fn test_succeeds_within_first_round() {
        let mut feed = FlakyFeed::failing(2);
        let quote = with_retry(&mut feed, &policy(), &QUOTE).await.unwrap();

        assert!(quote.is_some());
        assert_eq!(feed.reads, 3);
        assert_eq!(feed.reconnects, 0);
    }

    #[tokio::test]
    async fn test_reconnects_then_recovers() {
        let mut feed = FlakyFeed::failing(4);
        let quote = with_retry(&mut feed, &policy(), &QUOTE).await.unwrap();

        assert!(quote.is_some());
        assert_eq!(feed.reconnects, 1);
        assert_eq!(feed.reads, 5);
    }

    #[tokio::test]
    async fn test_abandons_after_second_round() {
        let mut feed = FlakyFeed::failing(100);
        let quote = with_retry(&mut feed, &policy(), &QUOTE).await.unwrap();

        assert!(quote.is_none());
        assert_eq!(feed.reads, 6);
        assert_eq!(feed.reconnects, 1);
    }

    #[tokio::test]
    async fn test_reconnect_exhaustion_is_fatal() {
        let mut feed = FlakyFeed {
            reconnect_ok: false,
            ..FlakyFeed::failing(100)
        };
        let result = with_retry(&mut feed, &policy(), &QUOTE).await;

        assert!(matches!(
            result,
            Err(FatalError::ReconnectExhausted { attempts: 2, .. })
        ));
        assert_eq!(feed.reconnects, 2);
        assert_eq!(feed.reads, 3);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&SchedulerConfig::default());
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert_eq!(policy.reconnect_attempts, 3);
    }
}
