use chrono::{DateTime, Utc};

use crate::classifier::NeighborClassifier;
use crate::config::EngineConfig;
use crate::execution::{OrderExecutor, Position, PositionManager};
use crate::history::{DelayedLabeler, FeatureHistoryBuffer};
use crate::models::{BarSnapshot, FeatureRow, Signal};
use crate::risk::{InstrumentSpec, RiskSizer, SessionRiskGate};
use crate::telemetry::TelemetryDeliveryQueue;

/// Emit aggregate stats every this many timer ticks.
const STATS_EVERY_TICKS: u64 = 20;

/// Aggregate counters, logged periodically from the timer path.
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    pub bars_processed: u64,
    pub ticks_skipped: u64,
    pub stale_bars: u64,
    pub gate_blocks: u64,
    pub signals_long: u64,
    pub signals_short: u64,
    pub signals_neutral: u64,
}

/// Owns every piece of engine state and composes the decision pipeline.
///
/// Both entry points take `&mut self`: the host scheduler never runs two
/// callbacks concurrently, so no locking is needed and unit tests drive
/// the engine deterministically bar by bar.
pub struct Engine {
    symbol: String,
    buffer: FeatureHistoryBuffer,
    labeler: DelayedLabeler,
    classifier: NeighborClassifier,
    sizer: RiskSizer,
    spec: InstrumentSpec,
    gate: SessionRiskGate,
    position_manager: PositionManager,
    telemetry: TelemetryDeliveryQueue,
    executor: Box<dyn OrderExecutor>,
    last_bar_time: Option<DateTime<Utc>>,
    stats: EngineStats,
    timer_ticks: u64,
}

impl Engine {
    pub fn new(config: &EngineConfig, executor: Box<dyn OrderExecutor>) -> Self {
        Self {
            symbol: config.symbol.clone(),
            buffer: FeatureHistoryBuffer::new(config.max_bars_back),
            labeler: DelayedLabeler::new(
                config.label_lookahead,
                config.label_neutral_zone_pips,
                config.pip_size,
            ),
            classifier: NeighborClassifier::new(config.neighbors_count),
            sizer: RiskSizer::new(config.risk_percent),
            spec: config.instrument_spec(),
            gate: SessionRiskGate::new(config.session_config()),
            position_manager: PositionManager::new(config.symbol.clone(), config.trade_rules()),
            telemetry: TelemetryDeliveryQueue::new(config.telemetry_config()),
            executor,
            last_bar_time: None,
            stats: EngineStats::default(),
            timer_ticks: 0,
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn position(&self) -> &Position {
        self.position_manager.position()
    }

    pub fn telemetry(&self) -> &TelemetryDeliveryQueue {
        &self.telemetry
    }

    pub fn history_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bar-path entry point: one invocation per feed poll.
    ///
    /// `bar` is None when the feed had nothing usable this tick; pending
    /// telemetry is still drained but no engine state mutates.
    pub async fn on_bar(&mut self, now: DateTime<Utc>, bar: Option<BarSnapshot>) {
        self.telemetry.drain(now).await;

        let Some(bar) = bar else {
            self.stats.ticks_skipped += 1;
            return;
        };

        // Breakeven/trailing run on every tick, new bar or not
        self.position_manager.manage(bar.close, self.executor.as_mut());

        if self.last_bar_time == Some(bar.bar_time) {
            self.stats.stale_bars += 1;
            return;
        }
        self.last_bar_time = Some(bar.bar_time);

        let equity = self.executor.account().equity;
        let status = self.gate.evaluate(now, equity);
        if status.transitioned {
            tracing::info!(
                "{}: session gate {}",
                self.symbol,
                if status.allowed { "active" } else { "inactive" }
            );
            self.executor.reset_session_trades();
        }
        if !status.allowed {
            self.stats.gate_blocks += 1;
            if let Some(block) = status.block {
                tracing::debug!("{}: entries blocked: {:?}", self.symbol, block);
            }
            return;
        }

        let features = bar.features();
        self.buffer
            .insert(FeatureRow::new(features, bar.close, bar.bar_time));
        self.labeler.label_matured(&mut self.buffer);

        let signal = self.classifier.classify(&self.buffer, &features);
        self.stats.bars_processed += 1;
        match signal {
            Signal::Long => self.stats.signals_long += 1,
            Signal::Short => self.stats.signals_short += 1,
            Signal::Neutral => self.stats.signals_neutral += 1,
        }

        if signal != Signal::Neutral {
            tracing::info!("{}: {:?} signal @ {:.5}", self.symbol, signal, bar.close);
            self.position_manager.apply_signal(
                signal,
                bar.close,
                self.executor.as_mut(),
                &self.sizer,
                &self.spec,
                &mut self.telemetry,
                now,
            );
        }
    }

    /// Timer-path entry point, independent cadence from the bar path.
    pub async fn on_timer(&mut self, now: DateTime<Utc>) {
        self.telemetry.drain(now).await;

        self.timer_ticks += 1;
        if self.timer_ticks % STATS_EVERY_TICKS == 0 {
            self.log_stats();
        }
    }

    pub fn log_stats(&self) {
        let account = self.executor.account();
        tracing::info!(
            "{}: bars {} (skipped {}, stale {}, gated {}) | signals L/S/N {}/{}/{} | \
             reports pending {} delivered {} dropped {} | balance {:.2} equity {:.2}",
            self.symbol,
            self.stats.bars_processed,
            self.stats.ticks_skipped,
            self.stats.stale_bars,
            self.stats.gate_blocks,
            self.stats.signals_long,
            self.stats.signals_short,
            self.stats.signals_neutral,
            self.telemetry.pending_count(),
            self.telemetry.delivered_total(),
            self.telemetry.dropped_total(),
            account.balance,
            account.equity
        );
    }
}
