use chrono::{DateTime, Utc};

use crate::execution::broker::{OrderExecutor, OrderRequest, OrderSide};
use crate::models::{Signal, TradeAction, TradeReport};
use crate::risk::{InstrumentSpec, RiskSizer, SizingError};
use crate::telemetry::TelemetryDeliveryQueue;

/// Per-symbol trading parameters, all pip-denominated distances.
#[derive(Debug, Clone)]
pub struct TradeRules {
    pub pip_size: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    /// Move the stop to entry once this far in profit. 0 disables.
    pub break_even_pips: f64,
    /// Start trailing once this far in profit. 0 disables.
    pub trail_start_pips: f64,
    pub trail_step_pips: f64,
    pub slippage_pips: f64,
    pub max_trades_per_symbol: u32,
    pub max_open_trades: u32,
}

/// Current position for the traded symbol. Exactly one per symbol,
/// mutated only through the named transitions below.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    Flat,
    Long {
        entry: f64,
        sl: f64,
        tp: f64,
        ticket: i64,
        volume: f64,
    },
    Short {
        entry: f64,
        sl: f64,
        tp: f64,
        ticket: i64,
        volume: f64,
    },
}

/// Entry/exit/breakeven/trailing state machine.
pub struct PositionManager {
    symbol: String,
    rules: TradeRules,
    position: Position,
}

impl PositionManager {
    pub fn new(symbol: String, rules: TradeRules) -> Self {
        Self {
            symbol,
            rules,
            position: Position::Flat,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    fn current_side(&self) -> Option<OrderSide> {
        match self.position {
            Position::Flat => None,
            Position::Long { .. } => Some(OrderSide::Buy),
            Position::Short { .. } => Some(OrderSide::Sell),
        }
    }

    /// Apply a classifier signal.
    ///
    /// Flat opens in the signal direction. An opposite signal closes the
    /// current position and then attempts the new open as a second step;
    /// if that open is blocked by exposure limits or rejected after the
    /// close succeeded, the symbol ends Flat. The two-step reversal is
    /// intentional and must not be made atomic without sign-off.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_signal(
        &mut self,
        signal: Signal,
        price: f64,
        executor: &mut dyn OrderExecutor,
        sizer: &RiskSizer,
        spec: &InstrumentSpec,
        telemetry: &mut TelemetryDeliveryQueue,
        now: DateTime<Utc>,
    ) {
        let desired = match signal {
            Signal::Long => OrderSide::Buy,
            Signal::Short => OrderSide::Sell,
            Signal::Neutral => return,
        };

        match self.current_side() {
            None => {
                self.try_open(desired, price, executor, sizer, spec, telemetry, now);
            }
            Some(current) if current == desired => {
                tracing::debug!("{}: already positioned {:?}, signal ignored", self.symbol, current);
            }
            Some(_) => {
                if self.close_current(price, executor, telemetry, now) {
                    self.try_open(desired, price, executor, sizer, spec, telemetry, now);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_open(
        &mut self,
        side: OrderSide,
        price: f64,
        executor: &mut dyn OrderExecutor,
        sizer: &RiskSizer,
        spec: &InstrumentSpec,
        telemetry: &mut TelemetryDeliveryQueue,
        now: DateTime<Utc>,
    ) {
        if !executor.can_open_new_trade(
            &self.symbol,
            self.rules.max_trades_per_symbol,
            self.rules.max_open_trades,
        ) {
            tracing::info!("{}: exposure limits reached, entry skipped", self.symbol);
            return;
        }

        let account = executor.account();
        let volume = match sizer.size(
            spec,
            account.balance,
            self.rules.stop_loss_pips,
            account.free_margin,
        ) {
            Ok(volume) => volume,
            Err(SizingError::ZeroResult) => {
                match sizer.fallback_min_size(spec, account.free_margin) {
                    Ok(volume) => {
                        tracing::warn!(
                            "{}: risk size rounded to zero, using minimum {}",
                            self.symbol,
                            volume
                        );
                        volume
                    }
                    Err(e) => {
                        tracing::warn!("{}: entry aborted: {}", self.symbol, e);
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{}: entry aborted: {}", self.symbol, e);
                return;
            }
        };

        let pip = self.rules.pip_size;
        let (sl, tp) = match side {
            OrderSide::Buy => (
                price - self.rules.stop_loss_pips * pip,
                price + self.rules.take_profit_pips * pip,
            ),
            OrderSide::Sell => (
                price + self.rules.stop_loss_pips * pip,
                price - self.rules.take_profit_pips * pip,
            ),
        };

        let request = OrderRequest {
            symbol: self.symbol.clone(),
            side,
            volume,
            price,
            sl,
            tp,
            slippage_pips: self.rules.slippage_pips,
        };

        match executor.open(&request) {
            Ok(ticket) => {
                self.position = match side {
                    OrderSide::Buy => Position::Long {
                        entry: price,
                        sl,
                        tp,
                        ticket,
                        volume,
                    },
                    OrderSide::Sell => Position::Short {
                        entry: price,
                        sl,
                        tp,
                        ticket,
                        volume,
                    },
                };

                let account = executor.account();
                let action = match side {
                    OrderSide::Buy => TradeAction::Buy,
                    OrderSide::Sell => TradeAction::Sell,
                };
                telemetry.enqueue(
                    &TradeReport {
                        symbol: self.symbol.clone(),
                        action,
                        volume,
                        price,
                        sl,
                        tp,
                        ticket,
                        balance: account.balance,
                        equity: account.equity,
                    },
                    now,
                );
                tracing::info!(
                    "{}: opened {:?} {} @ {:.5} (#{}, sl {:.5}, tp {:.5})",
                    self.symbol,
                    side,
                    volume,
                    price,
                    ticket,
                    sl,
                    tp
                );
            }
            Err(e) => {
                // No telemetry for rejected orders — nothing executed
                tracing::warn!("{}: open rejected: {}", self.symbol, e);
            }
        }
    }

    /// Close the current position. Returns true once the symbol is Flat.
    fn close_current(
        &mut self,
        price: f64,
        executor: &mut dyn OrderExecutor,
        telemetry: &mut TelemetryDeliveryQueue,
        now: DateTime<Utc>,
    ) -> bool {
        let (ticket, volume, sl, tp, action) = match self.position {
            Position::Flat => return true,
            Position::Long {
                ticket, volume, sl, tp, ..
            } => (ticket, volume, sl, tp, TradeAction::Sell),
            Position::Short {
                ticket, volume, sl, tp, ..
            } => (ticket, volume, sl, tp, TradeAction::Buy),
        };

        match executor.close(ticket, price) {
            Ok(()) => {
                self.position = Position::Flat;
                let account = executor.account();
                telemetry.enqueue(
                    &TradeReport {
                        symbol: self.symbol.clone(),
                        action,
                        volume,
                        price,
                        sl,
                        tp,
                        ticket,
                        balance: account.balance,
                        equity: account.equity,
                    },
                    now,
                );
                tracing::info!("{}: closed #{} @ {:.5}", self.symbol, ticket, price);
                true
            }
            Err(e) => {
                tracing::error!("{}: failed to close #{}: {}", self.symbol, ticket, e);
                false
            }
        }
    }

    /// Breakeven and trailing-stop maintenance for the open position.
    ///
    /// The stop only ever moves in the profitable direction: breakeven
    /// relocates it to entry once price is `break_even_pips` in favor and
    /// the stop still sits below (above, for Short) entry; trailing then
    /// follows price at `trail_step_pips` once `trail_start_pips` in
    /// favor. A rejected broker modification leaves the local stop
    /// unchanged.
    pub fn manage(&mut self, price: f64, executor: &mut dyn OrderExecutor) {
        let pip = self.rules.pip_size;
        let rules = &self.rules;

        match &mut self.position {
            Position::Flat => {}
            Position::Long {
                entry, sl, tp, ticket, ..
            } => {
                let profit = price - *entry;
                let mut new_sl = *sl;

                if rules.break_even_pips > 0.0
                    && profit >= rules.break_even_pips * pip
                    && *entry > new_sl
                {
                    new_sl = *entry;
                }
                if rules.trail_start_pips > 0.0 && profit >= rules.trail_start_pips * pip {
                    let candidate = price - rules.trail_step_pips * pip;
                    if candidate > new_sl {
                        new_sl = candidate;
                    }
                }

                if new_sl > *sl {
                    match executor.modify_stops(*ticket, new_sl, *tp) {
                        Ok(()) => {
                            tracing::debug!("#{}: stop raised {:.5} -> {:.5}", ticket, sl, new_sl);
                            *sl = new_sl;
                        }
                        Err(e) => tracing::warn!("#{}: stop modification rejected: {}", ticket, e),
                    }
                }
            }
            Position::Short {
                entry, sl, tp, ticket, ..
            } => {
                let profit = *entry - price;
                let mut new_sl = *sl;

                if rules.break_even_pips > 0.0
                    && profit >= rules.break_even_pips * pip
                    && *entry < new_sl
                {
                    new_sl = *entry;
                }
                if rules.trail_start_pips > 0.0 && profit >= rules.trail_start_pips * pip {
                    let candidate = price + rules.trail_step_pips * pip;
                    if candidate < new_sl {
                        new_sl = candidate;
                    }
                }

                if new_sl < *sl {
                    match executor.modify_stops(*ticket, new_sl, *tp) {
                        Ok(()) => {
                            tracing::debug!("#{}: stop lowered {:.5} -> {:.5}", ticket, sl, new_sl);
                            *sl = new_sl;
                        }
                        Err(e) => tracing::warn!("#{}: stop modification rejected: {}", ticket, e),
                    }
                }
            }
        }
    }
}
