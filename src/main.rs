use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use trendbot::api::{BinanceClient, TelegramNotifier};
use trendbot::config::BotConfig;
use trendbot::engine::{Engine, HaltReason};
use trendbot::execution::PaperVenue;
use trendbot::notify::{LogNotifier, OperatorChannel};

#[derive(Parser)]
#[command(name = "trendbot", about = "Unattended intraday EMA trend trader")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, default_value = "trendbot.toml")]
    config: PathBuf,

    /// Write notifications to the log instead of Telegram
    #[arg(long, default_value_t = false)]
    log_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let config = BotConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    tracing::info!(
        "🚀 trendbot starting | {} | {} / {}",
        config.symbol,
        config.strategy.fast_timeframe,
        config.strategy.confirm_timeframe
    );

    let notifier = match (&config.telegram, cli.log_only) {
        (Some(telegram), false) => OperatorChannel::Telegram(
            TelegramNotifier::new(telegram).context("Failed to build Telegram client")?,
        ),
        _ => {
            tracing::info!("Telegram disabled, notifications go to the log");
            OperatorChannel::Log(LogNotifier)
        }
    };

    let feed = BinanceClient::new(&config.binance).context("Failed to build Binance client")?;
    let venue = PaperVenue::new(feed, &config.paper, &config.instrument);

    let mut engine = Engine::start(&config, venue, notifier, Utc::now()).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, finishing current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    let reason = engine.run(shutdown_rx).await?;
    match reason {
        HaltReason::MaxDrawdown => tracing::warn!("Stopped: max drawdown reached"),
        HaltReason::DailyTargetReached => tracing::info!("Stopped: daily target reached"),
        HaltReason::Shutdown => tracing::info!("Stopped by operator"),
    }

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trendbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
