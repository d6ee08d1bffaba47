use chrono::{DateTime, NaiveDate, Timelike, Utc};

use crate::config::RiskConfig;
use crate::models::AccountSnapshot;

/// Circuit breakers to prevent catastrophic losses
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakers {
    pub max_drawdown_pct: f64,
    pub daily_target_pct: f64,
    pub min_margin_level: f64,
    pub max_daily_trades: u32,
    /// UTC trading window `[start, end)`; `None` disables the session filter
    pub session_hours: Option<(u32, u32)>,
}

impl Default for CircuitBreakers {
    fn default() -> Self {
        Self::from(&RiskConfig::default())
    }
}

impl From<&RiskConfig> for CircuitBreakers {
    fn from(config: &RiskConfig) -> Self {
        Self {
            max_drawdown_pct: config.max_drawdown_percent,
            daily_target_pct: config.daily_target_percent,
            min_margin_level: config.min_margin_level,
            max_daily_trades: config.max_daily_trades,
            session_hours: config
                .use_session_filter
                .then_some((config.session_start_hour, config.session_end_hour)),
        }
    }
}

/// Per-day risk baseline
#[derive(Debug, Clone, PartialEq)]
pub struct RiskState {
    pub start_equity: f64,
    pub current_day: NaiveDate,
    pub daily_trades: u32,
}

impl RiskState {
    pub fn new(start_equity: f64, now: DateTime<Utc>) -> Self {
        Self {
            start_equity,
            current_day: now.date_naive(),
            daily_trades: 0,
        }
    }

    /// True when `now` falls on a later UTC date than the current baseline
    pub fn is_new_day(&self, now: DateTime<Utc>) -> bool {
        now.date_naive() != self.current_day
    }

    /// Reset the baseline if `now` is on a new UTC date
    ///
    /// Returns true when a reset happened. Calling it again on the same date is a no-op.
    pub fn roll_day(&mut self, now: DateTime<Utc>, equity: f64) -> bool {
        if !self.is_new_day(now) {
            return false;
        }

        self.current_day = now.date_naive();
        self.start_equity = equity;
        self.daily_trades = 0;
        true
    }

    pub fn record_trade(&mut self) {
        self.daily_trades += 1;
    }

    /// Percentage lost since the start of the day (negative when in profit)
    pub fn drawdown_pct(&self, equity: f64) -> f64 {
        if self.start_equity <= 0.0 {
            return 0.0;
        }
        (self.start_equity - equity) * 100.0 / self.start_equity
    }

    pub fn daily_profit(&self, equity: f64) -> f64 {
        equity - self.start_equity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CircuitBreakerTrip {
    MaxDrawdown { drawdown_pct: f64 },
    DailyTargetReached { profit: f64 },
    DailyTradeLimit { trades: u32 },
    OutsideSession { hour: u32 },
    LowMargin { margin_level: f64 },
}

impl CircuitBreakers {
    pub fn check_drawdown(&self, state: &RiskState, equity: f64) -> Result<(), CircuitBreakerTrip> {
        let drawdown_pct = state.drawdown_pct(equity);
        if drawdown_pct > self.max_drawdown_pct {
            return Err(CircuitBreakerTrip::MaxDrawdown { drawdown_pct });
        }
        Ok(())
    }

    pub fn check_daily_target(
        &self,
        state: &RiskState,
        equity: f64,
    ) -> Result<(), CircuitBreakerTrip> {
        let profit = state.daily_profit(equity);
        if profit >= state.start_equity * self.daily_target_pct / 100.0 {
            return Err(CircuitBreakerTrip::DailyTargetReached { profit });
        }
        Ok(())
    }

    pub fn check_daily_trades(&self, state: &RiskState) -> Result<(), CircuitBreakerTrip> {
        if state.daily_trades >= self.max_daily_trades {
            return Err(CircuitBreakerTrip::DailyTradeLimit {
                trades: state.daily_trades,
            });
        }
        Ok(())
    }

    /// Session window check; a window with start > end wraps past midnight
    pub fn check_session(&self, now: DateTime<Utc>) -> Result<(), CircuitBreakerTrip> {
        let Some((start, end)) = self.session_hours else {
            return Ok(());
        };

        let hour = now.hour();
        let inside = if start <= end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        };

        if !inside {
            return Err(CircuitBreakerTrip::OutsideSession { hour });
        }
        Ok(())
    }

    /// Zero margin level means no margin in use and always passes
    pub fn check_margin(&self, account: &AccountSnapshot) -> Result<(), CircuitBreakerTrip> {
        let margin_level = account.margin_level;
        if margin_level > 0.0 && margin_level < self.min_margin_level {
            return Err(CircuitBreakerTrip::LowMargin { margin_level });
        }
        Ok(())
    }
}
