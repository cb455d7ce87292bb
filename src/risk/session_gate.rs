use chrono::{DateTime, NaiveDate, Timelike, Utc};

/// Session window and halting thresholds.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session window [start, end) in UTC hours; start > end wraps
    /// overnight, start == end trades around the clock.
    pub start_hour: u32,
    pub end_hour: u32,
    /// Daily drawdown halt, percent of day-start equity. 0 disables.
    pub max_daily_drawdown_pct: f64,
    /// Absolute equity floor. 0 disables.
    pub min_equity: f64,
}

/// Why the gate is blocking new entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateBlock {
    OutOfSession,
    DailyDrawdown,
    EquityFloor,
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateStatus {
    pub allowed: bool,
    /// True when the gate flipped inactive<->active on this evaluation;
    /// the orchestrator fires the session-reset hook on transitions.
    pub transitioned: bool,
    pub block: Option<GateBlock>,
}

/// Session-window and drawdown/equity halting logic.
///
/// A soft halt: a blocking gate stops new entries only and never
/// force-closes an existing position.
#[derive(Debug, Clone)]
pub struct SessionRiskGate {
    config: SessionConfig,
    active: bool,
    day_start_equity: f64,
    baseline_date: Option<NaiveDate>,
}

impl SessionRiskGate {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            active: false,
            day_start_equity: 0.0,
            baseline_date: None,
        }
    }

    /// Evaluate the gate for this tick.
    ///
    /// Rolls the daily drawdown baseline on UTC date change, then checks
    /// session window, daily drawdown, and the equity floor in that order
    /// (the first failing check is the reported block).
    pub fn evaluate(&mut self, now: DateTime<Utc>, equity: f64) -> GateStatus {
        self.roll_baseline(now, equity);

        let block = if !self.in_session(now) {
            Some(GateBlock::OutOfSession)
        } else if self.drawdown_exceeded(equity) {
            Some(GateBlock::DailyDrawdown)
        } else if self.equity_below_floor(equity) {
            Some(GateBlock::EquityFloor)
        } else {
            None
        };

        let allowed = block.is_none();
        let transitioned = allowed != self.active;
        self.active = allowed;

        GateStatus {
            allowed,
            transitioned,
            block,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn roll_baseline(&mut self, now: DateTime<Utc>, equity: f64) {
        let today = now.date_naive();
        if self.baseline_date != Some(today) {
            self.baseline_date = Some(today);
            self.day_start_equity = equity;
        }
    }

    fn in_session(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        let (start, end) = (self.config.start_hour, self.config.end_hour);
        if start == end {
            true
        } else if start < end {
            hour >= start && hour < end
        } else {
            // Overnight session, e.g. 22 -> 6
            hour >= start || hour < end
        }
    }

    fn drawdown_exceeded(&self, equity: f64) -> bool {
        if self.config.max_daily_drawdown_pct <= 0.0 || self.day_start_equity <= 0.0 {
            return false;
        }
        let drawdown_pct = (self.day_start_equity - equity) / self.day_start_equity * 100.0;
        drawdown_pct >= self.config.max_daily_drawdown_pct
    }

    fn equity_below_floor(&self, equity: f64) -> bool {
        self.config.min_equity > 0.0 && equity < self.config.min_equity
    }
}
