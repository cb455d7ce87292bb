use std::collections::HashMap;

use crate::execution::broker::{OrderError, OrderExecutor, OrderRequest, OrderSide};
use crate::models::AccountSnapshot;

#[derive(Debug, Clone)]
struct OpenOrder {
    symbol: String,
    side: OrderSide,
    volume: f64,
    entry_price: f64,
}

/// In-process simulated broker.
///
/// Tracks balance, open orders, and margin; realizes P&L into the balance
/// on close. Used by the binary for paper runs and by tests as the
/// deterministic order-execution collaborator.
pub struct PaperExecutor {
    next_ticket: i64,
    orders: HashMap<i64, OpenOrder>,
    balance: f64,
    margin_per_unit: f64,
    /// Account-currency value of a 1.0 price move per 1.0 of size.
    point_value: f64,
    session_trades: u32,
}

impl PaperExecutor {
    pub fn new(initial_balance: f64, margin_per_unit: f64, point_value: f64) -> Self {
        Self {
            next_ticket: 1,
            orders: HashMap::new(),
            balance: initial_balance,
            margin_per_unit,
            point_value,
            session_trades: 0,
        }
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn session_trades(&self) -> u32 {
        self.session_trades
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    fn used_margin(&self) -> f64 {
        self.orders
            .values()
            .map(|o| o.volume * self.margin_per_unit)
            .sum()
    }
}

impl OrderExecutor for PaperExecutor {
    fn open(&mut self, request: &OrderRequest) -> Result<i64, OrderError> {
        if request.volume <= 0.0 {
            return Err(OrderError::Rejected(format!(
                "non-positive volume {}",
                request.volume
            )));
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.session_trades += 1;

        self.orders.insert(
            ticket,
            OpenOrder {
                symbol: request.symbol.clone(),
                side: request.side,
                volume: request.volume,
                entry_price: request.price,
            },
        );

        tracing::info!(
            "paper open #{}: {:?} {} {} @ {:.5} (sl {:.5}, tp {:.5})",
            ticket,
            request.side,
            request.volume,
            request.symbol,
            request.price,
            request.sl,
            request.tp
        );
        Ok(ticket)
    }

    fn close(&mut self, ticket: i64, price: f64) -> Result<(), OrderError> {
        let order = self
            .orders
            .remove(&ticket)
            .ok_or(OrderError::UnknownTicket(ticket))?;

        let direction = match order.side {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        };
        let pnl = (price - order.entry_price) * direction * order.volume * self.point_value;
        self.balance += pnl;

        tracing::info!(
            "paper close #{}: {} @ {:.5}, pnl {:.2}",
            ticket,
            order.symbol,
            price,
            pnl
        );
        Ok(())
    }

    fn modify_stops(&mut self, ticket: i64, sl: f64, tp: f64) -> Result<(), OrderError> {
        if !self.orders.contains_key(&ticket) {
            return Err(OrderError::UnknownTicket(ticket));
        }
        tracing::debug!("paper modify #{}: sl {:.5}, tp {:.5}", ticket, sl, tp);
        Ok(())
    }

    fn can_open_new_trade(&self, symbol: &str, max_per_symbol: u32, max_total: u32) -> bool {
        let per_symbol = self
            .orders
            .values()
            .filter(|o| o.symbol == symbol)
            .count() as u32;
        let total = self.orders.len() as u32;
        per_symbol < max_per_symbol && total < max_total
    }

    fn account(&self) -> AccountSnapshot {
        // Open positions are not marked to market; equity tracks balance
        AccountSnapshot {
            balance: self.balance,
            equity: self.balance,
            free_margin: self.balance - self.used_margin(),
        }
    }

    fn reset_session_trades(&mut self) {
        self.session_trades = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy_request(symbol: &str, volume: f64, price: f64) -> OrderRequest {
        OrderRequest {
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            volume,
            price,
            sl: price - 0.0050,
            tp: price + 0.0100,
            slippage_pips: 3.0,
        }
    }

    #[test]
    fn test_open_assigns_increasing_tickets() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);

        let t1 = broker.open(&buy_request("EURUSD", 0.1, 1.1000)).unwrap();
        let t2 = broker.open(&buy_request("EURUSD", 0.1, 1.1010)).unwrap();
        assert!(t2 > t1);
        assert_eq!(broker.open_order_count(), 2);
    }

    #[test]
    fn test_rejects_non_positive_volume() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);
        let result = broker.open(&buy_request("EURUSD", 0.0, 1.1000));
        assert!(matches!(result, Err(OrderError::Rejected(_))));
    }

    #[test]
    fn test_close_realizes_pnl() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);

        let ticket = broker.open(&buy_request("EURUSD", 0.1, 1.1000)).unwrap();
        // +50 pips on 0.1 lots at 100k point value: 0.0050 * 0.1 * 100000 = 50
        broker.close(ticket, 1.1050).unwrap();

        assert!((broker.balance() - 10050.0).abs() < 1e-6);
        assert_eq!(broker.open_order_count(), 0);
    }

    #[test]
    fn test_close_unknown_ticket() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);
        assert_eq!(broker.close(99, 1.1), Err(OrderError::UnknownTicket(99)));
    }

    #[test]
    fn test_short_pnl_sign() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);

        let mut request = buy_request("EURUSD", 0.1, 1.1000);
        request.side = OrderSide::Sell;
        let ticket = broker.open(&request).unwrap();

        // Price fell 50 pips: short profits
        broker.close(ticket, 1.0950).unwrap();
        assert!((broker.balance() - 10050.0).abs() < 1e-6);
    }

    #[test]
    fn test_exposure_limits() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);

        assert!(broker.can_open_new_trade("EURUSD", 1, 2));
        broker.open(&buy_request("EURUSD", 0.1, 1.1000)).unwrap();

        // Per-symbol cap reached
        assert!(!broker.can_open_new_trade("EURUSD", 1, 2));
        assert!(broker.can_open_new_trade("GBPUSD", 1, 2));

        broker.open(&buy_request("GBPUSD", 0.1, 1.2500)).unwrap();
        // Total cap reached
        assert!(!broker.can_open_new_trade("USDJPY", 1, 2));
    }

    #[test]
    fn test_free_margin_shrinks_with_open_orders() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);
        assert_eq!(broker.account().free_margin, 10000.0);

        broker.open(&buy_request("EURUSD", 0.5, 1.1000)).unwrap();
        assert!((broker.account().free_margin - 9500.0).abs() < 1e-6);
    }

    #[test]
    fn test_session_trade_counter_resets() {
        let mut broker = PaperExecutor::new(10000.0, 1000.0, 100000.0);
        broker.open(&buy_request("EURUSD", 0.1, 1.1000)).unwrap();
        broker.open(&buy_request("GBPUSD", 0.1, 1.2500)).unwrap();
        assert_eq!(broker.session_trades(), 2);

        broker.reset_session_trades();
        assert_eq!(broker.session_trades(), 0);
    }
}
