use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;

use super::retry::{with_retry, ReadAccount, ReadCandles, ReadQuote, ReadTicketOpen, RetryPolicy};
use super::session::TradingSession;
use crate::api::{AccountSource, MarketData};
use crate::config::BotConfig;
use crate::error::FatalError;
use crate::execution::{EntryOutcome, ExecutionGateway, ExitReason, TrailOutcome, TrailingRule};
use crate::models::{AccountSnapshot, EntryRequest, Signal};
use crate::notify::Notifier;
use crate::risk::{CircuitBreakerTrip, CircuitBreakers, PositionSizer};
use crate::strategy::{Strategy, TrendStrategy};

/// Why the loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    MaxDrawdown,
    DailyTargetReached,
    Shutdown,
}

/// What one pass through the loop did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// A cycle gate failed; wait `gate_skip_secs` before the next one
    Skipped(CircuitBreakerTrip),
    /// Venue reads kept failing after reconnecting; try again next cycle
    DataUnavailable,
    Halted(HaltReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub signal: Signal,
    pub trail: Option<TrailOutcome>,
    pub entry: Option<EntryOutcome>,
}

/// Polling loop driving one symbol through the venue `V`
pub struct Engine<V, N> {
    symbol: String,
    strategy: TrendStrategy,
    breakers: CircuitBreakers,
    sizer: PositionSizer,
    trailing: TrailingRule,
    retry: RetryPolicy,
    candle_count: usize,
    poll_interval: Duration,
    gate_skip_interval: Duration,
    venue: V,
    notifier: N,
    session: TradingSession,
}

impl<V, N> Engine<V, N>
where
    V: MarketData + AccountSource + ExecutionGateway,
    N: Notifier,
{
    /// Select the symbol, read the starting equity and announce the start
    ///
    /// Nothing here is retried; any failure ends the run.
    pub async fn start(
        config: &BotConfig,
        mut venue: V,
        notifier: N,
        now: DateTime<Utc>,
    ) -> Result<Self, FatalError> {
        let account = match startup_account(&mut venue, &config.symbol).await {
            Ok(account) => account,
            Err(message) => {
                tracing::error!("CRITICAL: startup failed: {}", message);
                send(&notifier, &format!("<b>Startup failed</b>\n{}", message)).await;
                return Err(FatalError::Startup(message));
            }
        };

        let strategy = TrendStrategy::new(&config.strategy);
        let candle_count = config
            .strategy
            .candle_count
            .max(strategy.min_candles_required());

        let engine = Self {
            symbol: config.symbol.clone(),
            strategy,
            breakers: CircuitBreakers::from(&config.risk),
            sizer: PositionSizer::new(&config.risk, &config.instrument),
            trailing: TrailingRule {
                step_atr: config.risk.trailing_step,
                min_profit_atr: config.risk.trailing_min_profit_multiplier,
            },
            retry: RetryPolicy::from(&config.scheduler),
            candle_count,
            poll_interval: config.scheduler.poll_interval(),
            gate_skip_interval: config.scheduler.gate_skip_interval(),
            venue,
            notifier,
            session: TradingSession::new(account.equity, now),
        };

        tracing::info!(
            "Started {} on {} | start equity {:.2}",
            engine.strategy.name(),
            engine.symbol,
            account.equity
        );
        engine
            .announce(format!(
                "<b>Bot started</b>\nSymbol: {}\nStart equity: {:.2}",
                engine.symbol, account.equity
            ))
            .await;

        Ok(engine)
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    /// Run cycles until a halt condition, a fatal error, or `shutdown` turns true
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<HaltReason, FatalError> {
        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, stopping");
                self.announce("<b>Bot stopped</b> by operator".to_string())
                    .await;
                return Ok(HaltReason::Shutdown);
            }

            let pause = match self.run_cycle_at(Utc::now()).await? {
                CycleOutcome::Halted(reason) => return Ok(reason),
                CycleOutcome::Skipped(_) => self.gate_skip_interval,
                CycleOutcome::Completed(_) | CycleOutcome::DataUnavailable => self.poll_interval,
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    // Sender gone: nobody can ask for shutdown any more
                    if changed.is_err() {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }
    }

    /// One pass of the trading cycle as of `now`
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, FatalError> {
        match self.cycle(now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!("CRITICAL: {}", e);
                self.announce(format!("<b>CRITICAL</b>\nConnection lost, bot stopped.\n{}", e))
                    .await;
                Err(e)
            }
        }
    }

    async fn cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome, FatalError> {
        let Some(account) = with_retry(&mut self.venue, &self.retry, &ReadAccount).await? else {
            return Ok(CycleOutcome::DataUnavailable);
        };

        if self.session.risk.roll_day(now, account.equity) {
            tracing::info!(
                "New trading day {} | start equity {:.2}",
                self.session.risk.current_day,
                account.equity
            );
            self.announce(format!(
                "<b>New day</b>\nStart equity: {:.2}",
                account.equity
            ))
            .await;
        }

        if let Err(trip) = self.breakers.check_drawdown(&self.session.risk, account.equity) {
            self.halt_on_drawdown(&trip, &account).await;
            return Ok(CycleOutcome::Halted(HaltReason::MaxDrawdown));
        }

        if let Err(CircuitBreakerTrip::DailyTargetReached { profit }) = self
            .breakers
            .check_daily_target(&self.session.risk, account.equity)
        {
            tracing::info!("Daily target reached | profit {:.2}, stopping", profit);
            self.announce(format!("<b>Daily target reached</b>\nProfit: {:.2}", profit))
                .await;
            return Ok(CycleOutcome::Halted(HaltReason::DailyTargetReached));
        }

        if !self.detect_venue_close().await? {
            return Ok(CycleOutcome::DataUnavailable);
        }

        let gates = self
            .breakers
            .check_daily_trades(&self.session.risk)
            .and_then(|_| self.breakers.check_session(now));
        if let Err(trip) = gates {
            tracing::info!("Cycle skipped: {:?}", trip);
            return Ok(CycleOutcome::Skipped(trip));
        }

        let fast = ReadCandles {
            symbol: &self.symbol,
            timeframe: self.strategy.fast_timeframe(),
            count: self.candle_count,
        };
        let Some(fast) = with_retry(&mut self.venue, &self.retry, &fast).await? else {
            return Ok(CycleOutcome::DataUnavailable);
        };
        let confirm = ReadCandles {
            symbol: &self.symbol,
            timeframe: self.strategy.confirm_timeframe(),
            count: self.candle_count,
        };
        let Some(confirm) = with_retry(&mut self.venue, &self.retry, &confirm).await? else {
            return Ok(CycleOutcome::DataUnavailable);
        };

        let analysis = self.strategy.analyze(&fast, &confirm);
        let Some(atr) = analysis.fast_atr() else {
            tracing::warn!(
                "Not enough candles for indicators ({} fast, {} confirm)",
                fast.len(),
                confirm.len()
            );
            return Ok(CycleOutcome::Completed(CycleReport {
                signal: Signal::Hold,
                trail: None,
                entry: None,
            }));
        };

        tracing::info!(
            "Signal: {:?} | ATR {:.4} | open: {}",
            analysis.signal,
            atr,
            self.session.positions.is_open()
        );

        let mut report = CycleReport {
            signal: analysis.signal,
            trail: None,
            entry: None,
        };

        if self.session.positions.is_open() {
            let Some(outcome) = self.trail_stop(atr).await? else {
                return Ok(CycleOutcome::DataUnavailable);
            };
            report.trail = Some(outcome);
        }

        if let Some(side) = analysis.signal.side() {
            if !self.session.positions.is_open() {
                if let Err(trip) = self.breakers.check_margin(&account) {
                    tracing::warn!("Entry skipped: {:?}", trip);
                    return Ok(CycleOutcome::Completed(report));
                }

                let quote_read = ReadQuote {
                    symbol: &self.symbol,
                };
                let Some(quote) = with_retry(&mut self.venue, &self.retry, &quote_read).await?
                else {
                    return Ok(CycleOutcome::DataUnavailable);
                };

                let request = self
                    .sizer
                    .plan_entry(&self.symbol, side, &quote, atr, account.balance);
                report.entry = self.enter(&request, now).await;
            }
        }

        Ok(CycleOutcome::Completed(report))
    }

    /// Close the slot if the venue no longer holds the ticket
    ///
    /// Returns false when the venue could not be asked.
    async fn detect_venue_close(&mut self) -> Result<bool, FatalError> {
        let Some(ticket) = self.session.positions.position().map(|p| p.ticket) else {
            return Ok(true);
        };

        let Some(open) =
            with_retry(&mut self.venue, &self.retry, &ReadTicketOpen { ticket }).await?
        else {
            return Ok(false);
        };

        if !open {
            if let Some(position) = self.session.positions.close(ExitReason::VenueStopOrTarget) {
                self.announce(format!(
                    "<b>Position closed</b>\n{} {:.2} @ {:.2}\nClosed by venue stop-loss or take-profit",
                    position.side, position.size, position.open_price
                ))
                .await;
            }
        }
        Ok(true)
    }

    async fn halt_on_drawdown(&mut self, trip: &CircuitBreakerTrip, account: &AccountSnapshot) {
        tracing::error!(
            "Max drawdown breached: {:?} | equity {:.2} vs start {:.2}",
            trip,
            account.equity,
            self.session.risk.start_equity
        );

        if self.session.positions.is_open() {
            match self.venue.close_all(&self.symbol).await {
                Ok(result) if result.is_done() => {
                    self.session.positions.close(ExitReason::MaxDrawdown);
                }
                Ok(result) => {
                    tracing::error!("Forced close rejected: {:?}", result.status);
                }
                Err(e) => {
                    tracing::error!("Forced close failed: {}", e);
                }
            }
        }

        let drawdown = self.session.risk.drawdown_pct(account.equity);
        self.announce(format!(
            "<b>Max drawdown reached</b>\nDrawdown: {:.2}%\nEquity: {:.2}\nBot stopped.",
            drawdown, account.equity
        ))
        .await;
    }

    /// Returns None when no quote could be read
    async fn trail_stop(&mut self, atr: f64) -> Result<Option<TrailOutcome>, FatalError> {
        let quote_read = ReadQuote {
            symbol: &self.symbol,
        };
        let Some(quote) = with_retry(&mut self.venue, &self.retry, &quote_read).await? else {
            return Ok(None);
        };

        let outcome = match self
            .session
            .positions
            .trail(&mut self.venue, &quote, atr, &self.trailing)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Stop modify failed: {}", e);
                self.announce(format!("<b>Stop modify failed</b>\n{}", e))
                    .await;
                return Ok(Some(TrailOutcome::Unchanged));
            }
        };

        match &outcome {
            TrailOutcome::Moved { from, to } => {
                tracing::info!("Trailing stop moved {:.2} -> {:.2}", from, to);
                self.announce(format!(
                    "<b>Trailing stop updated</b>\nNew SL: {:.2}",
                    to
                ))
                .await;
            }
            TrailOutcome::Rejected { candidate, comment } => {
                tracing::error!("Stop modify to {:.2} rejected: {}", candidate, comment);
                self.announce(format!(
                    "<b>Stop modify failed</b>\nSL {:.2}: {}",
                    candidate, comment
                ))
                .await;
            }
            TrailOutcome::NotOpen | TrailOutcome::Unchanged => {}
        }

        Ok(Some(outcome))
    }

    async fn enter(
        &mut self,
        request: &EntryRequest,
        now: DateTime<Utc>,
    ) -> Option<EntryOutcome> {
        let outcome = match self
            .session
            .positions
            .submit_entry(&mut self.venue, request, now)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Entry {} failed: {}", request.side, e);
                self.announce(format!("<b>Order failed</b>\n{} {}", request.side, e))
                    .await;
                return None;
            }
        };

        match &outcome {
            EntryOutcome::Opened(position) => {
                self.session.risk.record_trade();
                tracing::info!(
                    "{} opened | ticket {} | size {:.2} @ {:.2} | SL {:.2} | TP {:.2} | trades today {}",
                    position.side,
                    position.ticket,
                    position.size,
                    position.open_price,
                    position.stop_loss,
                    position.take_profit,
                    self.session.risk.daily_trades
                );
                self.announce(format!(
                    "<b>{} opened</b>\nPrice: {:.2}\nSize: {:.2}\nSL: {:.2}\nTP: {:.2}",
                    position.side,
                    position.open_price,
                    position.size,
                    position.stop_loss,
                    position.take_profit
                ))
                .await;
            }
            EntryOutcome::Rejected { code, comment } => {
                tracing::error!("Entry {} rejected: {} ({})", request.side, comment, code);
                self.announce(format!(
                    "<b>Order rejected</b>\n{}: {} (code {})",
                    request.side, comment, code
                ))
                .await;
            }
            EntryOutcome::AlreadyOpen => {
                tracing::warn!("Entry skipped, position already open");
            }
        }

        Some(outcome)
    }

    async fn announce(&self, text: String) {
        send(&self.notifier, &text).await;
    }
}

async fn startup_account<V>(venue: &mut V, symbol: &str) -> Result<AccountSnapshot, String>
where
    V: MarketData + AccountSource,
{
    venue
        .select_symbol(symbol)
        .await
        .map_err(|e| format!("cannot select {}: {}", symbol, e))?;
    venue
        .account_snapshot()
        .await
        .map_err(|e| format!("cannot read account: {}", e))
}

/// Deliver a notification; failures are logged and dropped
async fn send<N: Notifier>(notifier: &N, text: &str) {
    if let Err(e) = notifier.notify(text).await {
        tracing::warn!("Notification failed: {}", e);
    }
}
