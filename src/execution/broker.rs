use thiserror::Error;

use crate::models::AccountSnapshot;

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("exposure limit reached for {0}")]
    ExposureLimit(String),
    #[error("unknown ticket {0}")]
    UnknownTicket(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Request to open a market position.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub price: f64,
    pub sl: f64,
    pub tp: f64,
    pub slippage_pips: f64,
}

/// Broker-side order primitives — an external collaborator seam.
///
/// The engine only ever talks to the broker through this trait; the repo
/// ships [`PaperExecutor`](crate::execution::PaperExecutor) as the
/// in-process implementation.
pub trait OrderExecutor {
    /// Open a market position; returns the broker ticket.
    fn open(&mut self, request: &OrderRequest) -> Result<i64, OrderError>;

    /// Close the position identified by `ticket` at `price`.
    fn close(&mut self, ticket: i64, price: f64) -> Result<(), OrderError>;

    /// Move the stop-loss / take-profit of an open position.
    fn modify_stops(&mut self, ticket: i64, sl: f64, tp: f64) -> Result<(), OrderError>;

    /// Exposure-limit query: may a new trade be opened on `symbol` given
    /// the per-symbol and total open-trade caps?
    fn can_open_new_trade(&self, symbol: &str, max_per_symbol: u32, max_total: u32) -> bool;

    /// Current account state.
    fn account(&self) -> AccountSnapshot;

    /// Session transition hook; brokers tracking per-session trade counts
    /// reset them here.
    fn reset_session_trades(&mut self) {}
}
