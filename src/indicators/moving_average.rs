/// Calculate Exponential Moving Average (EMA) for every bar
///
/// Seeded with the SMA of the first `period` values. The returned vector is aligned
/// with `prices`; bars before the seed are `None`.
pub fn calculate_ema_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut series = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return series;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
    series[period - 1] = Some(ema);

    for (i, price) in prices.iter().enumerate().skip(period) {
        ema = (price - ema) * multiplier + ema;
        series[i] = Some(ema);
    }

    series
}
