/// Average True Range (ATR) indicator
///
/// Measures market volatility by calculating the average of true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// Uses Wilder's smoothing (same as RSI and ADX) for the moving average.

use crate::models::Candle;

/// True range of `current` relative to the previous bar's close
pub fn true_range(current: &Candle, prev_close: f64) -> f64 {
    (current.high - current.low)
        .max((current.high - prev_close).abs())
        .max((current.low - prev_close).abs())
}

/// Calculate ATR for every candle
///
/// The output is aligned with `candles`; the first value appears at index `period`
/// (it needs `period` true ranges, each of which needs a previous close).
pub fn calculate_atr_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut series = vec![None; candles.len()];
    if period == 0 || candles.len() < period + 1 {
        return series;
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| true_range(&w[1], w[0].close))
        .collect();

    // First ATR is simple average of first 'period' true ranges
    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    series[period] = Some(atr);

    // Apply Wilder's smoothing for subsequent values
    for (i, tr) in true_ranges.iter().enumerate().skip(period) {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
        series[i + 1] = Some(atr);
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn last_value(series: Vec<Option<f64>>) -> Option<f64> {
        series.last().copied().flatten()
    }

    fn create_test_candles(prices: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Candle {
                timestamp: Utc::now() + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_calculate_atr() {
        // Low volatility market
        let candles = create_test_candles(&[(100.0, 101.0, 99.0, 100.0); 15]);
        let atr = last_value(calculate_atr_series(&candles, 14));

        assert!(atr.is_some());
        // ATR should be around 2.0 (high-low range)
        assert!(atr.unwrap() > 1.5 && atr.unwrap() < 2.5);
    }

    #[test]
    fn test_calculate_atr_high_volatility() {
        // Wide bars drifting upward: every true range is at least 20
        let high_vol_prices: Vec<_> = (0..15)
            .map(|i| {
                let base = 100.0 + 2.0 * i as f64;
                (base, base + 12.0, base - 8.0, base + 5.0)
            })
            .collect();

        let candles = create_test_candles(&high_vol_prices);
        let atr = last_value(calculate_atr_series(&candles, 14));

        assert!(atr.is_some());
        // ATR should be higher for volatile market
        assert!(atr.unwrap() > 10.0);
    }

    #[test]
    fn test_insufficient_data() {
        let candles = create_test_candles(&[(100.0, 101.0, 99.0, 100.0); 2]);
        let atr = last_value(calculate_atr_series(&candles, 14));

        assert!(atr.is_none());
    }

    #[test]
    fn test_atr_series_alignment() {
        let candles = create_test_candles(&[(100.0, 105.0, 95.0, 100.0); 16]);
        let atr_series = calculate_atr_series(&candles, 14);

        assert_eq!(atr_series.len(), 16);
        assert!(atr_series[13].is_none());
        assert_eq!(atr_series[14], Some(10.0));
        assert_eq!(atr_series[15], Some(10.0));
    }

    #[test]
    fn test_true_range_uses_gap() {
        let candles = create_test_candles(&[(100.0, 101.0, 99.0, 100.0), (110.0, 112.0, 109.0, 111.0)]);
        // Gap up: high - prev close dominates high - low
        assert_eq!(true_range(&candles[1], candles[0].close), 12.0);
    }
}
