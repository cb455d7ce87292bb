// Risk management module
pub mod session_gate;
pub mod sizer;

pub use session_gate::{GateBlock, GateStatus, SessionConfig, SessionRiskGate};
pub use sizer::{InstrumentSpec, RiskSizer, SizingError};
