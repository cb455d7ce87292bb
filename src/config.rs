use anyhow::Context;
use serde::Deserialize;

use crate::execution::TradeRules;
use crate::risk::{InstrumentSpec, SessionConfig};
use crate::telemetry::TelemetryConfig;

/// Full engine configuration.
///
/// Loaded from an optional TOML file layered with `LORENTZBOT_*`
/// environment variables; every field has a default so a bare environment
/// still produces a runnable paper configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub symbol: String,

    // Classifier
    pub neighbors_count: usize,
    pub max_bars_back: usize,
    pub label_lookahead: usize,
    pub label_neutral_zone_pips: f64,

    // Risk and trade management
    pub risk_percent: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub break_even_pips: f64,
    pub trail_start_pips: f64,
    pub trail_step_pips: f64,
    pub slippage_pips: f64,
    pub max_daily_drawdown: f64,
    pub min_equity: f64,
    pub max_trades_per_symbol: u32,
    pub max_open_trades: u32,

    // Session window (UTC hours, start == end trades around the clock)
    pub session_start_hour: u32,
    pub session_end_hour: u32,

    // Telemetry webhook
    pub report_url: String,
    pub report_api_key: Option<String>,
    pub report_bearer_token: Option<String>,
    pub report_max_retries: u32,
    pub report_retry_seconds: i64,
    pub http_timeout_ms: u64,

    // Scheduling
    pub timer_resolution_seconds: u64,
    pub poll_interval_seconds: u64,

    // Indicator bridge
    pub feed_url: String,

    // Instrument data
    pub pip_size: f64,
    pub tick_size: f64,
    pub tick_value: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub size_step: f64,
    pub margin_per_unit: f64,

    // Paper account
    pub initial_balance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),

            neighbors_count: 8,
            max_bars_back: 2000,
            label_lookahead: 4,
            label_neutral_zone_pips: 3.0,

            risk_percent: 1.0,
            stop_loss_pips: 50.0,
            take_profit_pips: 100.0,
            break_even_pips: 25.0,
            trail_start_pips: 40.0,
            trail_step_pips: 15.0,
            slippage_pips: 3.0,
            max_daily_drawdown: 5.0, // percent of day-start equity
            min_equity: 0.0,         // disabled
            max_trades_per_symbol: 1,
            max_open_trades: 5,

            session_start_hour: 0,
            session_end_hour: 0, // around the clock

            report_url: String::new(),
            report_api_key: None,
            report_bearer_token: None,
            report_max_retries: 5,
            report_retry_seconds: 60,
            http_timeout_ms: 5000,

            timer_resolution_seconds: 15,
            poll_interval_seconds: 15,

            feed_url: "http://127.0.0.1:8787/bar".to_string(),

            pip_size: 0.0001,
            tick_size: 0.00001,
            tick_value: 1.0,
            min_size: 0.01,
            max_size: 100.0,
            size_step: 0.01,
            margin_per_unit: 1000.0,

            initial_balance: 10000.0,
        }
    }
}

impl EngineConfig {
    /// Load from an optional TOML file plus `LORENTZBOT_*` env vars.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("lorentzbot").required(false)),
        };

        let settings = builder
            .add_source(config::Environment::with_prefix("LORENTZBOT"))
            .build()
            .context("failed to read configuration")?;

        let config: EngineConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(config.normalized())
    }

    /// Coerce option minimums so degenerate values cannot disable the
    /// engine's bookkeeping (the recognized options are all >= 1).
    pub fn normalized(mut self) -> Self {
        self.neighbors_count = self.neighbors_count.max(1);
        self.max_bars_back = self.max_bars_back.max(1);
        self.label_lookahead = self.label_lookahead.max(1);
        self.report_max_retries = self.report_max_retries.max(1);
        self.report_retry_seconds = self.report_retry_seconds.max(1);
        self.timer_resolution_seconds = self.timer_resolution_seconds.max(1);
        self.poll_interval_seconds = self.poll_interval_seconds.max(1);
        self.session_start_hour %= 24;
        self.session_end_hour %= 24;
        self
    }

    /// Startup validation; failures here are fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.report_url.is_empty() {
            anyhow::bail!("report_url is not configured (set LORENTZBOT_REPORT_URL)");
        }
        if self.feed_url.is_empty() {
            anyhow::bail!("feed_url is not configured (set LORENTZBOT_FEED_URL)");
        }
        if self.pip_size <= 0.0 || self.tick_size <= 0.0 || self.tick_value <= 0.0 {
            anyhow::bail!("instrument data must be positive (pip_size/tick_size/tick_value)");
        }
        Ok(())
    }

    pub fn instrument_spec(&self) -> InstrumentSpec {
        InstrumentSpec {
            pip_size: self.pip_size,
            tick_size: self.tick_size,
            tick_value: self.tick_value,
            min_size: self.min_size,
            max_size: self.max_size,
            size_step: self.size_step,
            margin_per_unit: self.margin_per_unit,
        }
    }

    pub fn trade_rules(&self) -> TradeRules {
        TradeRules {
            pip_size: self.pip_size,
            stop_loss_pips: self.stop_loss_pips,
            take_profit_pips: self.take_profit_pips,
            break_even_pips: self.break_even_pips,
            trail_start_pips: self.trail_start_pips,
            trail_step_pips: self.trail_step_pips,
            slippage_pips: self.slippage_pips,
            max_trades_per_symbol: self.max_trades_per_symbol,
            max_open_trades: self.max_open_trades,
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            url: self.report_url.clone(),
            api_key: self.report_api_key.clone(),
            bearer_token: self.report_bearer_token.clone(),
            http_timeout_ms: self.http_timeout_ms,
            max_retries: self.report_max_retries,
            retry_seconds: self.report_retry_seconds,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            start_hour: self.session_start_hour,
            end_hour: self.session_end_hour,
            max_daily_drawdown_pct: self.max_daily_drawdown,
            min_equity: self.min_equity,
        }
    }

    /// Account-currency value of a 1.0 price move per 1.0 of size.
    pub fn point_value(&self) -> f64 {
        self.tick_value / self.tick_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_runnable() {
        let config = EngineConfig::default().normalized();
        assert!(config.neighbors_count >= 1);
        assert!(config.max_bars_back >= 1);
        assert!(config.timer_resolution_seconds >= 1);
        assert_eq!(config.symbol, "EURUSD");
    }

    #[test]
    fn test_normalized_coerces_minimums() {
        let config = EngineConfig {
            neighbors_count: 0,
            max_bars_back: 0,
            label_lookahead: 0,
            report_max_retries: 0,
            report_retry_seconds: 0,
            timer_resolution_seconds: 0,
            poll_interval_seconds: 0,
            session_start_hour: 25,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.neighbors_count, 1);
        assert_eq!(config.max_bars_back, 1);
        assert_eq!(config.label_lookahead, 1);
        assert_eq!(config.report_max_retries, 1);
        assert_eq!(config.report_retry_seconds, 1);
        assert_eq!(config.timer_resolution_seconds, 1);
        assert_eq!(config.poll_interval_seconds, 1);
        assert_eq!(config.session_start_hour, 1);
    }

    #[test]
    fn test_validate_requires_report_url() {
        let config = EngineConfig::default();
        assert!(config.validate().is_err());

        let config = EngineConfig {
            report_url: "https://example.com/hook".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_instrument_data() {
        let config = EngineConfig {
            report_url: "https://example.com/hook".to_string(),
            pip_size: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_point_value_derivation() {
        let config = EngineConfig::default();
        // tick_value 1.0 per 0.00001 tick => 100000 per full point
        assert!((config.point_value() - 100000.0).abs() < 1e-6);
    }

    #[test]
    fn test_projections_carry_instrument_data() {
        let config = EngineConfig::default();

        let spec = config.instrument_spec();
        assert_eq!(spec.pip_size, config.pip_size);
        assert_eq!(spec.size_step, config.size_step);

        let rules = config.trade_rules();
        assert_eq!(rules.stop_loss_pips, config.stop_loss_pips);
        assert_eq!(rules.max_open_trades, config.max_open_trades);

        let session = config.session_config();
        assert_eq!(session.max_daily_drawdown_pct, config.max_daily_drawdown);
    }
}
