// Trading strategy module
pub mod signals;

use crate::config::StrategyConfig;
use crate::indicators::{build_snapshots, IndicatorPeriods};
use crate::models::{Candle, IndicatorSnapshot, Signal, Timeframe};
use signals::SignalConfig;

/// Indicator snapshots and the signal derived from them for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub signal: Signal,
    pub fast: Vec<IndicatorSnapshot>,
    pub confirm: Vec<IndicatorSnapshot>,
}

impl Analysis {
    /// Latest fast-timeframe ATR, used for stop sizing and trailing
    pub fn fast_atr(&self) -> Option<f64> {
        self.fast.last().map(|s| s.atr)
    }
}

/// Base trait for trading strategies
pub trait Strategy: Send + Sync {
    /// Analyze candles of the fast and confirmation timeframes (oldest first)
    fn analyze(&self, fast: &[Candle], confirm: &[Candle]) -> Analysis;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles per timeframe for a complete two-bar evaluation
    fn min_candles_required(&self) -> usize;
}

/// EMA crossover trend strategy confirmed on a slower timeframe
///
/// Enters on a fresh fast/slow EMA cross that happens on both timeframes at once,
/// while RSI is neutral and ATR/ADX show enough volatility and trend strength.
#[derive(Debug, Clone)]
pub struct TrendStrategy {
    config: SignalConfig,
    periods: IndicatorPeriods,
    fast_timeframe: Timeframe,
    confirm_timeframe: Timeframe,
}

impl TrendStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            config: SignalConfig::from(config),
            periods: IndicatorPeriods::from(config),
            fast_timeframe: config.fast_timeframe,
            confirm_timeframe: config.confirm_timeframe,
        }
    }

    pub fn fast_timeframe(&self) -> Timeframe {
        self.fast_timeframe
    }

    pub fn confirm_timeframe(&self) -> Timeframe {
        self.confirm_timeframe
    }
}

impl Default for TrendStrategy {
    fn default() -> Self {
        Self::new(&StrategyConfig::default())
    }
}

impl Strategy for TrendStrategy {
    fn analyze(&self, fast: &[Candle], confirm: &[Candle]) -> Analysis {
        let fast = build_snapshots(self.fast_timeframe, fast, &self.periods, 2);
        let confirm = build_snapshots(self.confirm_timeframe, confirm, &self.periods, 2);
        let signal = signals::evaluate(&fast, &confirm, &self.config);

        Analysis {
            signal,
            fast,
            confirm,
        }
    }

    fn name(&self) -> &str {
        "TrendStrategy"
    }

    fn min_candles_required(&self) -> usize {
        self.periods.warm_up() + 1
    }
}
