// Runtime configuration: defaults, optional TOML file, then TRENDBOT__* environment overrides
use crate::error::ConfigError;
use crate::models::Timeframe;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub symbol: String,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub instrument: InstrumentConfig,
    pub scheduler: SchedulerConfig,
    pub paper: PaperConfig,
    pub binance: BinanceConfig,
    pub telegram: Option<TelegramConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            strategy: StrategyConfig::default(),
            risk: RiskConfig::default(),
            instrument: InstrumentConfig::default(),
            scheduler: SchedulerConfig::default(),
            paper: PaperConfig::default(),
            binance: BinanceConfig::default(),
            telegram: None,
        }
    }
}

/// Indicator periods and entry filters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    pub fast_timeframe: Timeframe,
    pub confirm_timeframe: Timeframe,
    pub candle_count: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub min_atr: f64,
    pub min_adx: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fast_timeframe: Timeframe::M1,
            confirm_timeframe: Timeframe::M5,
            candle_count: 100,
            ema_fast_period: 5,
            ema_slow_period: 10,
            atr_period: 20,
            adx_period: 14,
            rsi_period: 14,
            rsi_lower: 30.0,
            rsi_upper: 70.0,
            min_atr: 0.015,
            min_adx: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub risk_percent: f64,
    pub daily_target_percent: f64,
    pub max_drawdown_percent: f64,
    pub min_margin_level: f64,
    pub max_daily_trades: u32,
    pub use_session_filter: bool,
    pub session_start_hour: u32,
    pub session_end_hour: u32,
    pub stop_loss_atr_multiplier: f64,
    pub min_stop_loss_points: f64,
    pub reward_multiple: f64,
    pub trailing_step: f64,
    pub trailing_min_profit_multiplier: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_percent: 0.05,
            daily_target_percent: 1.0,
            max_drawdown_percent: 10.0,
            min_margin_level: 500.0,
            max_daily_trades: 3,
            use_session_filter: true,
            session_start_hour: 8, // London open
            session_end_hour: 16,  // NY midday
            stop_loss_atr_multiplier: 2.0,
            min_stop_loss_points: 50.0,
            reward_multiple: 3.0,
            trailing_step: 1.5,
            trailing_min_profit_multiplier: 2.0,
        }
    }
}

/// Price increment and its monetary value for one unit of size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstrumentConfig {
    pub point: f64,
    pub value_per_point: f64,
    pub min_size: f64,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            point: 0.01,
            value_per_point: 1.0,
            min_size: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub gate_skip_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    pub reconnect_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            gate_skip_secs: 60,
            retry_attempts: 3,
            retry_delay_secs: 10,
            reconnect_attempts: 3,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn gate_skip_interval(&self) -> Duration {
        Duration::from_secs(self.gate_skip_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Simulated account used by the paper venue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaperConfig {
    pub starting_balance: f64,
    pub leverage: f64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            starting_balance: 10_000.0,
            leverage: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinanceConfig {
    pub base_url: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            requests_per_minute: 600,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_url")]
    pub base_url: String,
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".to_string()
}

impl BotConfig {
    /// Load configuration
    ///
    /// Later sources win: built-in defaults, the TOML file at `path` (if it exists),
    /// then environment variables such as `TRENDBOT__RISK__MAX_DAILY_TRADES=5`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("TRENDBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: BotConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        let r = &self.risk;
        let i = &self.instrument;
        let sch = &self.scheduler;

        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol must not be empty"));
        }
        if s.ema_fast_period == 0 || s.ema_slow_period == 0 {
            return Err(invalid("EMA periods must be positive"));
        }
        if s.ema_fast_period >= s.ema_slow_period {
            return Err(invalid("ema_fast_period must be shorter than ema_slow_period"));
        }
        if s.atr_period == 0 || s.adx_period == 0 || s.rsi_period == 0 {
            return Err(invalid("ATR, ADX and RSI periods must be positive"));
        }
        if s.candle_count < 2 {
            return Err(invalid("candle_count must be at least 2"));
        }
        if s.rsi_lower >= s.rsi_upper {
            return Err(invalid("rsi_lower must be below rsi_upper"));
        }
        if r.session_start_hour > 23 || r.session_end_hour > 23 {
            return Err(invalid("session hours must be within 0..=23"));
        }
        if r.risk_percent <= 0.0 || r.max_drawdown_percent <= 0.0 {
            return Err(invalid("risk_percent and max_drawdown_percent must be positive"));
        }
        if r.reward_multiple <= 0.0 || r.stop_loss_atr_multiplier <= 0.0 {
            return Err(invalid("reward_multiple and stop_loss_atr_multiplier must be positive"));
        }
        if i.point <= 0.0 || i.value_per_point <= 0.0 || i.min_size <= 0.0 {
            return Err(invalid("instrument point, value_per_point and min_size must be positive"));
        }
        if sch.retry_attempts == 0 || sch.reconnect_attempts == 0 {
            return Err(invalid("retry_attempts and reconnect_attempts must be at least 1"));
        }
        if self.paper.leverage <= 0.0 {
            return Err(invalid("paper leverage must be positive"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}
