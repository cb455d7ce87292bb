use chrono::Utc;
use clap::Parser;
use tokio::time::{interval, Duration, MissedTickBehavior};

use lorentzbot::config::EngineConfig;
use lorentzbot::engine::Engine;
use lorentzbot::execution::PaperExecutor;
use lorentzbot::feed::BridgeFeedClient;

#[derive(Debug, Parser)]
#[command(name = "lorentzbot", about = "Lorentzian k-NN trading-signal engine")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override the configured symbol
    #[arg(long)]
    symbol: Option<String>,

    /// Log filter, e.g. "lorentzbot=debug"
    #[arg(long, default_value = "lorentzbot=info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(&cli.log);

    // Any failure from here to the first tick is fatal
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(symbol) = cli.symbol {
        config.symbol = symbol;
    }
    config.validate()?;

    tracing::info!("🚀 lorentzbot starting");
    tracing::info!("  Symbol: {}", config.symbol);
    tracing::info!(
        "  Classifier: k={} over {} bars, lookahead {} (neutral zone {} pips)",
        config.neighbors_count,
        config.max_bars_back,
        config.label_lookahead,
        config.label_neutral_zone_pips
    );
    tracing::info!(
        "  Risk: {}% per trade, stop {} pips, daily drawdown halt {}%",
        config.risk_percent,
        config.stop_loss_pips,
        config.max_daily_drawdown
    );
    tracing::info!("  Feed: {}", config.feed_url);
    tracing::info!("  Webhook: {}", config.report_url);

    let feed = BridgeFeedClient::new(config.feed_url.clone(), config.http_timeout_ms);
    let executor = PaperExecutor::new(
        config.initial_balance,
        config.margin_per_unit,
        config.point_value(),
    );
    let mut engine = Engine::new(&config, Box::new(executor));

    // One task drives both cadences, so the bar path and the timer path
    // never run concurrently
    let mut bar_ticker = interval(Duration::from_secs(config.poll_interval_seconds));
    bar_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut timer_ticker = interval(Duration::from_secs(config.timer_resolution_seconds));
    timer_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        "🔄 Running: bar poll every {}s, timer every {}s. Press Ctrl+C to stop.",
        config.poll_interval_seconds,
        config.timer_resolution_seconds
    );

    loop {
        tokio::select! {
            _ = bar_ticker.tick() => {
                let bar = feed.latest_bar().await;
                engine.on_bar(Utc::now(), bar).await;
            }
            _ = timer_ticker.tick() => {
                engine.on_timer(Utc::now()).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    engine.log_stats();
    tracing::info!("👋 lorentzbot stopped");
    Ok(())
}

fn setup_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}
