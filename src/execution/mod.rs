// Order execution module
pub mod broker;
pub mod paper;
pub mod position_manager;

pub use broker::{OrderError, OrderExecutor, OrderRequest, OrderSide};
pub use paper::PaperExecutor;
pub use position_manager::{Position, PositionManager, TradeRules};
