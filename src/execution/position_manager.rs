use chrono::{DateTime, Utc};

use crate::error::VenueError;
use crate::execution::ExecutionGateway;
use crate::models::{EntryRequest, OrderStatus, Position, Quote, Side, StopModifyRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Venue executed the attached stop-loss or take-profit
    VenueStopOrTarget,
    /// Forced close on drawdown breach
    MaxDrawdown,
}

/// Result of an entry attempt
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Opened(Position),
    Rejected { code: i64, comment: String },
    /// A position is already open; nothing was submitted
    AlreadyOpen,
}

/// Result of a trailing-stop pass
#[derive(Debug, Clone, PartialEq)]
pub enum TrailOutcome {
    NotOpen,
    Unchanged,
    Moved { from: f64, to: f64 },
    Rejected { candidate: f64, comment: String },
}

/// Trailing-stop parameters, expressed as ATR multiples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingRule {
    /// Distance kept between price and the trailed stop
    pub step_atr: f64,
    /// Favorable move required before trailing starts
    pub min_profit_atr: f64,
}

/// Owner of the single position slot
///
/// `Flat -> Open` only after a confirmed fill, `Open -> Open` for stop updates the
/// venue accepted, `Open -> Flat` on close. A second entry while open is refused.
#[derive(Debug, Default)]
pub struct PositionManager {
    slot: Option<Position>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn state(&self) -> PositionState {
        match self.slot {
            Some(_) => PositionState::Open,
            None => PositionState::Flat,
        }
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_some()
    }

    pub fn position(&self) -> Option<&Position> {
        self.slot.as_ref()
    }

    /// Submit `request` and open the slot only if the venue confirms the fill
    pub async fn submit_entry<G: ExecutionGateway>(
        &mut self,
        gateway: &mut G,
        request: &EntryRequest,
        now: DateTime<Utc>,
    ) -> Result<EntryOutcome, VenueError> {
        if self.is_open() {
            return Ok(EntryOutcome::AlreadyOpen);
        }

        let result = gateway.submit_entry(request).await?;

        match (result.status, result.ticket) {
            (OrderStatus::Done, Some(ticket)) => {
                let position = Position {
                    side: request.side,
                    size: request.size,
                    open_price: request.price,
                    stop_loss: request.stop_loss,
                    take_profit: request.take_profit,
                    ticket,
                    opened_at: now,
                };
                self.slot = Some(position.clone());
                Ok(EntryOutcome::Opened(position))
            }
            (OrderStatus::Done, None) => Err(VenueError::Decode(
                "entry reported done without a ticket".to_string(),
            )),
            (OrderStatus::Rejected { code, comment }, _) => {
                Ok(EntryOutcome::Rejected { code, comment })
            }
        }
    }

    /// Candidate stop for the open position, if price has moved far enough
    ///
    /// Long: once bid exceeds open + min_profit, the candidate is bid - step.
    /// Short: once ask is below open - min_profit, the candidate is ask + step.
    /// Returns None unless the candidate is strictly tighter than the current stop.
    pub fn trailing_candidate(&self, quote: &Quote, atr: f64, rule: &TrailingRule) -> Option<f64> {
        let position = self.slot.as_ref()?;
        let step = atr * rule.step_atr;
        let min_profit = atr * rule.min_profit_atr;

        let candidate = match position.side {
            Side::Long if quote.bid > position.open_price + min_profit => quote.bid - step,
            Side::Short if quote.ask < position.open_price - min_profit => quote.ask + step,
            _ => return None,
        };

        tightens(position.side, position.stop_loss, candidate).then_some(candidate)
    }

    /// Store a venue-confirmed stop; loosening moves are ignored
    ///
    /// Returns true if the stored stop changed.
    pub fn apply_stop_loss(&mut self, new_stop: f64) -> bool {
        match self.slot.as_mut() {
            Some(position) if tightens(position.side, position.stop_loss, new_stop) => {
                position.stop_loss = new_stop;
                true
            }
            _ => false,
        }
    }

    /// Recompute the trailing stop and send it to the venue
    ///
    /// In-memory state changes only after the venue reports success.
    pub async fn trail<G: ExecutionGateway>(
        &mut self,
        gateway: &mut G,
        quote: &Quote,
        atr: f64,
        rule: &TrailingRule,
    ) -> Result<TrailOutcome, VenueError> {
        let Some(position) = self.slot.as_ref() else {
            return Ok(TrailOutcome::NotOpen);
        };
        let Some(candidate) = self.trailing_candidate(quote, atr, rule) else {
            return Ok(TrailOutcome::Unchanged);
        };

        let from = position.stop_loss;
        let request = StopModifyRequest {
            ticket: position.ticket,
            stop_loss: candidate,
            take_profit: position.take_profit,
        };

        let result = gateway.modify_stop_loss(&request).await?;
        match result.status {
            OrderStatus::Done => {
                self.apply_stop_loss(candidate);
                Ok(TrailOutcome::Moved {
                    from,
                    to: candidate,
                })
            }
            OrderStatus::Rejected { comment, .. } => Ok(TrailOutcome::Rejected {
                candidate,
                comment,
            }),
        }
    }

    /// Empty the slot, returning the position that was open
    pub fn close(&mut self, reason: ExitReason) -> Option<Position> {
        let position = self.slot.take()?;
        tracing::info!(
            "Position {} closed ({:?}) | {} {:.2} @ {:.2}",
            position.ticket,
            reason,
            position.side,
            position.size,
            position.open_price
        );
        Some(position)
    }
}

/// Whether `candidate` moves the stop toward price for `side`
fn tightens(side: Side, current: f64, candidate: f64) -> bool {
    match side {
        Side::Long => candidate > current,
        Side::Short => candidate < current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderResult;
    use chrono::TimeZone;

    /// Gateway double answering with fixed results and recording calls
    struct FixedGateway {
        entry: OrderResult,
        modify: OrderResult,
        entries: usize,
        modifies: Vec<StopModifyRequest>,
    }

    impl FixedGateway {
        fn accepting() -> Self {
            Self {
                entry: OrderResult::done(42),
                modify: OrderResult::done(42),
                entries: 0,
                modifies: Vec::new(),
            }
        }
    }

    impl ExecutionGateway for FixedGateway {
        async fn submit_entry(&mut self, _: &EntryRequest) -> Result<OrderResult, VenueError> {
            self.entries += 1;
            Ok(self.entry.clone())
        }

        async fn modify_stop_loss(
            &mut self,
            request: &StopModifyRequest,
        ) -> Result<OrderResult, VenueError> {
            self.modifies.push(*request);
            Ok(self.modify.clone())
        }

        async fn close_all(&mut self, _: &str) -> Result<OrderResult, VenueError> {
            Ok(OrderResult::done(42))
        }

        async fn is_position_open(&mut self, _: u64) -> Result<bool, VenueError> {
            Ok(true)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
    }

    fn request(side: Side) -> EntryRequest {
        let (stop_loss, take_profit) = match side {
            Side::Long => (1990.0, 2030.0),
            Side::Short => (2010.0, 1970.0),
        };
        EntryRequest {
            symbol: "XAUUSD".to_string(),
            side,
            size: 0.1,
            price: 2000.0,
            stop_loss,
            take_profit,
        }
    }

    fn rule() -> TrailingRule {
        TrailingRule {
            step_atr: 1.5,
            min_profit_atr: 2.0,
        }
    }

    async fn open(side: Side) -> (PositionManager, FixedGateway) {
        let mut pm = PositionManager::new();
        let mut gateway = FixedGateway::accepting();
        pm.submit_entry(&mut gateway, &request(side), now()).await.unwrap();
        (pm, gateway)
    }

    #[tokio::test]
    async fn test_open_position_on_fill() {
        let (pm, gateway) = open(Side::Long).await;

        assert_eq!(pm.state(), PositionState::Open);
        assert_eq!(gateway.entries, 1);

        let position = pm.position().unwrap();
        assert_eq!(position.ticket, 42);
        assert_eq!(position.open_price, 2000.0);
        assert_eq!(position.stop_loss, 1990.0);
        assert_eq!(position.opened_at, now());
    }

    #[tokio::test]
    async fn test_rejection_stays_flat() {
        let mut pm = PositionManager::new();
        let mut gateway = FixedGateway {
            entry: OrderResult::rejected(10019, "No money"),
            ..FixedGateway::accepting()
        };

        let outcome = pm
            .submit_entry(&mut gateway, &request(Side::Long), now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            EntryOutcome::Rejected {
                code: 10019,
                comment: "No money".to_string()
            }
        );
        assert_eq!(pm.state(), PositionState::Flat);
    }

    #[tokio::test]
    async fn test_prevent_second_entry() {
        let (mut pm, mut gateway) = open(Side::Long).await;

        let outcome = pm
            .submit_entry(&mut gateway, &request(Side::Short), now())
            .await
            .unwrap();

        assert_eq!(outcome, EntryOutcome::AlreadyOpen);
        assert_eq!(gateway.entries, 1, "no order may reach the venue while open");
        assert_eq!(pm.position().unwrap().side, Side::Long);
    }

    #[tokio::test]
    async fn test_long_trailing_requires_min_profit() {
        let (pm, _) = open(Side::Long).await;

        // ATR 2: min profit 4, step 3. Bid 2003 is not beyond 2004
        let quote = Quote { bid: 2003.0, ask: 2003.5 };
        assert_eq!(pm.trailing_candidate(&quote, 2.0, &rule()), None);

        let quote = Quote { bid: 2010.0, ask: 2010.5 };
        assert_eq!(pm.trailing_candidate(&quote, 2.0, &rule()), Some(2007.0));
    }

    #[tokio::test]
    async fn test_short_trailing_moves_down() {
        let (mut pm, mut gateway) = open(Side::Short).await;

        let quote = Quote { bid: 1989.5, ask: 1990.0 };
        let outcome = pm.trail(&mut gateway, &quote, 2.0, &rule()).await.unwrap();

        assert_eq!(outcome, TrailOutcome::Moved { from: 2010.0, to: 1993.0 });
        assert_eq!(pm.position().unwrap().stop_loss, 1993.0);
        assert_eq!(gateway.modifies[0].take_profit, 1970.0);
    }

    #[tokio::test]
    async fn test_trailing_is_monotone_and_idempotent() {
        let (mut pm, mut gateway) = open(Side::Long).await;

        let high = Quote { bid: 2020.0, ask: 2020.5 };
        let outcome = pm.trail(&mut gateway, &high, 2.0, &rule()).await.unwrap();
        assert_eq!(outcome, TrailOutcome::Moved { from: 1990.0, to: 2017.0 });

        // Same input again: nothing to do, nothing sent
        let outcome = pm.trail(&mut gateway, &high, 2.0, &rule()).await.unwrap();
        assert_eq!(outcome, TrailOutcome::Unchanged);

        // Price pulls back: candidate would loosen the stop
        let lower = Quote { bid: 2012.0, ask: 2012.5 };
        let outcome = pm.trail(&mut gateway, &lower, 2.0, &rule()).await.unwrap();
        assert_eq!(outcome, TrailOutcome::Unchanged);

        assert_eq!(gateway.modifies.len(), 1);
        assert_eq!(pm.position().unwrap().stop_loss, 2017.0);
    }

    #[tokio::test]
    async fn test_rejected_modify_keeps_old_stop() {
        let (mut pm, _) = open(Side::Long).await;
        let mut gateway = FixedGateway {
            modify: OrderResult::rejected(10016, "Invalid stops"),
            ..FixedGateway::accepting()
        };

        let quote = Quote { bid: 2020.0, ask: 2020.5 };
        let outcome = pm.trail(&mut gateway, &quote, 2.0, &rule()).await.unwrap();

        assert!(matches!(outcome, TrailOutcome::Rejected { candidate, .. } if candidate == 2017.0));
        assert_eq!(pm.position().unwrap().stop_loss, 1990.0);
    }

    #[tokio::test]
    async fn test_apply_stop_loss_ignores_loosening() {
        let (mut pm, _) = open(Side::Short).await;

        assert!(!pm.apply_stop_loss(2015.0));
        assert!(!pm.apply_stop_loss(2010.0));
        assert!(pm.apply_stop_loss(2005.0));
        assert_eq!(pm.position().unwrap().stop_loss, 2005.0);
    }

    #[tokio::test]
    async fn test_close_returns_to_flat() {
        let (mut pm, _) = open(Side::Long).await;

        let closed = pm.close(ExitReason::VenueStopOrTarget).unwrap();
        assert_eq!(closed.ticket, 42);
        assert_eq!(pm.state(), PositionState::Flat);
        assert!(pm.close(ExitReason::MaxDrawdown).is_none());
    }

    #[test]
    fn test_trail_when_flat() {
        let pm = PositionManager::new();
        let quote = Quote { bid: 1.0, ask: 1.0 };
        assert_eq!(pm.trailing_candidate(&quote, 1.0, &rule()), None);
    }
}
