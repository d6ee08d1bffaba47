use super::{calculate_adx_series, calculate_atr_series, calculate_ema_series, calculate_rsi_series};
use crate::config::StrategyConfig;
use crate::models::{Candle, IndicatorSnapshot, Timeframe};

/// Indicator periods used to build snapshots
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPeriods {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub atr: usize,
    pub adx: usize,
    pub rsi: usize,
}

impl From<&StrategyConfig> for IndicatorPeriods {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            ema_fast: config.ema_fast_period,
            ema_slow: config.ema_slow_period,
            atr: config.atr_period,
            adx: config.adx_period,
            rsi: config.rsi_period,
        }
    }
}

impl IndicatorPeriods {
    /// Candles needed before the first complete snapshot
    pub fn warm_up(&self) -> usize {
        [
            self.ema_fast,
            self.ema_slow,
            self.atr + 1,
            2 * self.adx,
            self.rsi + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Build indicator snapshots for the most recent `keep` bars
///
/// Only bars where every indicator is warmed up produce a snapshot, so the result
/// can hold fewer than `keep` entries (or none) when history is short.
/// Snapshots are ordered oldest first.
pub fn build_snapshots(
    timeframe: Timeframe,
    candles: &[Candle],
    periods: &IndicatorPeriods,
    keep: usize,
) -> Vec<IndicatorSnapshot> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let ema_fast = calculate_ema_series(&closes, periods.ema_fast);
    let ema_slow = calculate_ema_series(&closes, periods.ema_slow);
    let atr = calculate_atr_series(candles, periods.atr);
    let adx = calculate_adx_series(candles, periods.adx);
    let rsi = calculate_rsi_series(&closes, periods.rsi);

    let start = candles.len().saturating_sub(keep);

    (start..candles.len())
        .filter_map(|i| {
            Some(IndicatorSnapshot {
                timeframe,
                timestamp: candles[i].timestamp,
                ema_fast: ema_fast[i]?,
                ema_slow: ema_slow[i]?,
                atr: atr[i]?,
                adx: adx[i]?,
                rsi: rsi[i]?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn periods() -> IndicatorPeriods {
        IndicatorPeriods::from(&StrategyConfig::default())
    }

    fn candles(n: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 2000.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1;
                Candle {
                    timestamp: start + chrono::Duration::minutes(i as i64),
                    open: close - 0.2,
                    high: close + 0.5,
                    low: close - 0.6,
                    close,
                    volume: 10.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_warm_up_uses_longest_indicator() {
        // ADX(14) needs 28 candles, ATR(20) needs 21
        assert_eq!(periods().warm_up(), 28);
    }

    #[test]
    fn test_build_snapshots_keeps_latest_bars() {
        let candles = candles(100);
        let snapshots = build_snapshots(Timeframe::M1, &candles, &periods(), 2);

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].timestamp, candles[98].timestamp);
        assert_eq!(snapshots[1].timestamp, candles[99].timestamp);
        assert!(snapshots.iter().all(|s| s.timeframe == Timeframe::M1));
        assert!(snapshots[1].rsi > 0.0 && snapshots[1].rsi < 100.0);
    }

    #[test]
    fn test_build_snapshots_short_history() {
        // Exactly one warmed-up bar
        let candles = candles(periods().warm_up());
        let snapshots = build_snapshots(Timeframe::M5, &candles, &periods(), 2);
        assert_eq!(snapshots.len(), 1);

        let too_short = build_snapshots(Timeframe::M5, &candles[..10], &periods(), 2);
        assert!(too_short.is_empty());
    }
}
