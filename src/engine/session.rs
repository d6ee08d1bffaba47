use chrono::{DateTime, Utc};

use crate::execution::PositionManager;
use crate::risk::RiskState;

/// All mutable trading state of one run
#[derive(Debug)]
pub struct TradingSession {
    pub risk: RiskState,
    pub positions: PositionManager,
}

impl TradingSession {
    pub fn new(start_equity: f64, now: DateTime<Utc>) -> Self {
        Self {
            risk: RiskState::new(start_equity, now),
            positions: PositionManager::new(),
        }
    }
}
