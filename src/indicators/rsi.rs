/// Calculate Relative Strength Index (RSI) for every bar
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Average gain and loss are seeded with a simple mean over the first `period`
/// changes and then smoothed with Wilder's method. The output is aligned with
/// `prices`; the first value appears at index `period`.
pub fn calculate_rsi_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut series = vec![None; prices.len()];
    if period == 0 || prices.len() < period + 1 {
        return series;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss =
        changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;
    series[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for (i, change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period as f64 - 1.0) + change.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + (-change).max(0.0)) / period as f64;
        series[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    series
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_value(series: Vec<Option<f64>>) -> Option<f64> {
        series.last().copied().flatten()
    }

    #[test]
    fn test_rsi_calculation() {
        // Test with known values
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5,
            46.0, 46.5, 46.25, 46.0, 46.5,
        ];

        let rsi = last_value(calculate_rsi_series(&prices, 14));
        assert!(rsi.is_some());

        let rsi_value = rsi.unwrap();
        assert!(rsi_value > 0.0 && rsi_value < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        let rsi = last_value(calculate_rsi_series(&prices, 14));
        assert!(rsi.is_none());
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        let rsi = last_value(calculate_rsi_series(&prices, 5));
        assert!(rsi.is_some());
        assert_eq!(rsi.unwrap(), 100.0); // All gains = RSI 100
    }

    #[test]
    fn test_rsi_series_alignment() {
        let prices = vec![10.0, 11.0, 10.0, 11.0, 10.0, 11.0];
        let series = calculate_rsi_series(&prices, 2);

        assert_eq!(series[0], None);
        assert_eq!(series[1], None);
        // One gain and one loss of equal size
        assert_eq!(series[2], Some(50.0));
        assert!(series[5].is_some());
    }
}
