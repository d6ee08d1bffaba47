use crate::config::StrategyConfig;
use crate::models::{IndicatorSnapshot, Signal};

/// Entry filters applied on the fast timeframe
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub min_atr: f64,
    pub min_adx: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::from(&StrategyConfig::default())
    }
}

impl From<&StrategyConfig> for SignalConfig {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            rsi_lower: config.rsi_lower,
            rsi_upper: config.rsi_upper,
            min_atr: config.min_atr,
            min_adx: config.min_adx,
        }
    }
}

/// Direction of an EMA crossover between two consecutive bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

/// Detect a fast/slow EMA crossover from `prev` to `cur`
///
/// Strict inequalities on both bars: touching lines are not a cross.
pub fn detect_crossover(prev: &IndicatorSnapshot, cur: &IndicatorSnapshot) -> Crossover {
    if prev.ema_fast < prev.ema_slow && cur.ema_fast > cur.ema_slow {
        Crossover::Bullish
    } else if prev.ema_fast > prev.ema_slow && cur.ema_fast < cur.ema_slow {
        Crossover::Bearish
    } else {
        Crossover::None
    }
}

/// RSI inside the neutral band, ATR and ADX at or above their floors
pub fn passes_filters(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> bool {
    snapshot.rsi > config.rsi_lower
        && snapshot.rsi < config.rsi_upper
        && snapshot.atr >= config.min_atr
        && snapshot.adx >= config.min_adx
}

/// Two-timeframe trend signal
///
/// Reads the last two snapshots of each timeframe (oldest first). A crossover must
/// occur on the fast timeframe and in the same direction on the confirmation
/// timeframe, and the fast timeframe's latest bar must pass the RSI/ATR/ADX filters.
/// Fewer than two snapshots on either side yields `Signal::Hold`.
pub fn evaluate(
    fast: &[IndicatorSnapshot],
    confirm: &[IndicatorSnapshot],
    config: &SignalConfig,
) -> Signal {
    let (Some((fast_prev, fast_cur)), Some((confirm_prev, confirm_cur))) =
        (last_two(fast), last_two(confirm))
    else {
        return Signal::Hold;
    };

    if !passes_filters(fast_cur, config) {
        return Signal::Hold;
    }

    match (
        detect_crossover(fast_prev, fast_cur),
        detect_crossover(confirm_prev, confirm_cur),
    ) {
        (Crossover::Bullish, Crossover::Bullish) => Signal::Buy,
        (Crossover::Bearish, Crossover::Bearish) => Signal::Sell,
        _ => Signal::Hold,
    }
}

fn last_two(snapshots: &[IndicatorSnapshot]) -> Option<(&IndicatorSnapshot, &IndicatorSnapshot)> {
    match snapshots {
        [.., prev, cur] => Some((prev, cur)),
        _ => None,
    }
}
