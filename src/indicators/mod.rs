// Technical indicators module
// Implements EMA, RSI, ATR, ADX series and per-bar snapshots

pub mod adx;
pub mod atr;
pub mod moving_average;
pub mod rsi;
pub mod snapshot;

pub use adx::calculate_adx_series;
pub use atr::{calculate_atr_series, true_range};
pub use moving_average::calculate_ema_series;
pub use rsi::calculate_rsi_series;
pub use snapshot::{build_snapshots, IndicatorPeriods};
