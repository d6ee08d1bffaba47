/// Average Directional Index (ADX) - Measures trend strength
///
/// ADX ranges from 0 to 100:
/// - ADX > 25: Strong trend (bull or bear)
/// - ADX 20-25: Moderate trend
/// - ADX < 20: Weak trend / choppy / ranging market
///
/// ADX is the Wilder-smoothed DX, so the first value needs `2 * period` candles
/// of directional movement.

use super::atr::true_range;
use crate::models::Candle;

/// Calculate ADX for every candle, aligned with `candles`
///
/// The first value appears at index `2 * period - 1`.
pub fn calculate_adx_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut series = vec![None; candles.len()];
    if period == 0 || candles.len() < 2 * period {
        return series;
    }

    // Step 1: True Range and Directional Movement per bar (index i pairs candle i+1 with i)
    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    let mut plus_dms = Vec::with_capacity(candles.len() - 1);
    let mut minus_dms = Vec::with_capacity(candles.len() - 1);

    for w in candles.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        true_ranges.push(true_range(cur, prev.close));

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        plus_dms.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dms.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
    }

    // Step 2: Wilder-smoothed TR/DM, and DX from the resulting +DI/-DI
    let smoothed_tr = wilder_series(&true_ranges, period);
    let smoothed_plus = wilder_series(&plus_dms, period);
    let smoothed_minus = wilder_series(&minus_dms, period);

    let dx: Vec<f64> = smoothed_tr
        .iter()
        .zip(smoothed_plus.iter().zip(smoothed_minus.iter()))
        .map(|(&tr, (&plus, &minus))| directional_index(tr, plus, minus))
        .collect();

    // Step 3: ADX = Wilder-smoothed DX
    // dx[k] belongs to true range index k + period - 1, i.e. candle k + period
    for (k, adx) in wilder_series(&dx, period).into_iter().enumerate() {
        series[k + 2 * period - 1] = Some(adx);
    }

    series
}

fn directional_index(smoothed_tr: f64, smoothed_plus_dm: f64, smoothed_minus_dm: f64) -> f64 {
    if smoothed_tr <= 0.0 {
        return 0.0;
    }

    let plus_di = smoothed_plus_dm / smoothed_tr * 100.0;
    let minus_di = smoothed_minus_dm / smoothed_tr * 100.0;
    let di_sum = plus_di + minus_di;

    if di_sum > 0.0 {
        (plus_di - minus_di).abs() / di_sum * 100.0
    } else {
        0.0
    }
}

/// Wilder's smoothing: SMA seed over the first `period` values, then
/// `(prev * (period - 1) + value) / period`. Output starts at the seed.
fn wilder_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.len() < period {
        return Vec::new();
    }

    let mut smoothed = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(smoothed);

    for value in &values[period..] {
        smoothed = (smoothed * (period as f64 - 1.0) + value) / period as f64;
        out.push(smoothed);
    }

    out
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

    fn trending_candles(n: usize) -> Vec<Candle> {
        let prices: Vec<_> = (0..n)
            .map(|i| {
                let base = 100.0 + 3.0 * i as f64;
                (base, base + 5.0, base - 1.0, base + 3.0)
            })
            .collect();
        create_test_candles(&prices)
    }

    #[test]
    fn test_adx_strong_uptrend() {
        let candles = trending_candles(30);
        let adx = last_value(calculate_adx_series(&candles, 14)).unwrap();

        // Every bar makes a higher high and higher low, so -DM is always zero
        assert!(adx > 90.0, "ADX should be near 100 in a clean trend, got {:.2}", adx);
    }

    #[test]
    fn test_adx_choppy_market() {
        // Simulating a choppy/ranging market
        let pattern = [
            (100.0, 102.0, 98.0, 100.0),
            (100.0, 103.0, 97.0, 99.0),
            (99.0, 102.0, 98.0, 101.0),
            (101.0, 103.0, 99.0, 100.0),
            (100.0, 102.0, 98.0, 99.0),
        ];
        let prices: Vec<_> = pattern.iter().cycle().take(30).copied().collect();

        let candles = create_test_candles(&prices);
        let adx = last_value(calculate_adx_series(&candles, 14)).unwrap();

        assert!(adx < 40.0, "ADX should be lower in choppy market, got {:.2}", adx);
    }

    #[test]
    fn test_adx_series_alignment() {
        let candles = trending_candles(30);
        let series = calculate_adx_series(&candles, 14);

        assert_eq!(series.len(), 30);
        assert!(series[26].is_none());
        assert!(series[27].is_some());
        assert!(series[29].is_some());
    }

    #[test]
    fn test_adx_insufficient_data() {
        let candles = trending_candles(10);
        let result = last_value(calculate_adx_series(&candles, 14));

        assert!(result.is_none(), "Should return None for insufficient data");
    }
}
