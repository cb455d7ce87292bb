use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a classifier vote or a supervised row label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

/// The four classifier inputs for one bar.
///
/// Fast values come from the primary timeframe, slow values from the
/// secondary timeframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub rsi_fast: f64,
    pub adx_fast: f64,
    pub rsi_slow: f64,
    pub adx_slow: f64,
}

/// One bar of feature history.
///
/// Owned exclusively by the history buffer. The label starts unset and is
/// written exactly once by the delayed labeler; `None` means "not yet
/// labeled" and is distinct from an assigned `Neutral`.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub features: FeatureVector,
    pub close: f64,
    pub bar_time: DateTime<Utc>,
    label: Option<Signal>,
}

impl FeatureRow {
    pub fn new(features: FeatureVector, close: f64, bar_time: DateTime<Utc>) -> Self {
        Self {
            features,
            close,
            bar_time,
            label: None,
        }
    }

    pub fn label(&self) -> Option<Signal> {
        self.label
    }

    /// Assign the label. Returns false (and leaves the row untouched) if a
    /// label was already assigned — labels are write-once.
    pub fn set_label(&mut self, label: Signal) -> bool {
        if self.label.is_some() {
            return false;
        }
        self.label = Some(label);
        true
    }
}

/// Latest closed bar as reported by the external indicator bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct BarSnapshot {
    pub rsi_fast: f64,
    pub adx_fast: f64,
    pub rsi_slow: f64,
    pub adx_slow: f64,
    pub close: f64,
    pub bar_time: DateTime<Utc>,
}

impl BarSnapshot {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            rsi_fast: self.rsi_fast,
            adx_fast: self.adx_fast,
            rsi_slow: self.rsi_slow,
            adx_slow: self.adx_slow,
        }
    }
}

/// Account state as reported by the order-execution collaborator.
#[derive(Debug, Clone, Copy)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    pub free_margin: f64,
}

/// Executed order side as reported to the telemetry webhook.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Telemetry payload for one executed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeReport {
    pub symbol: String,
    pub action: TradeAction,
    pub volume: f64,
    pub price: f64,
    pub sl: f64,
    pub tp: f64,
    pub ticket: i64,
    pub balance: f64,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_write_once() {
        let mut row = FeatureRow::new(
            FeatureVector {
                rsi_fast: 50.0,
                adx_fast: 20.0,
                rsi_slow: 55.0,
                adx_slow: 25.0,
            },
            1.1000,
            Utc::now(),
        );

        assert_eq!(row.label(), None);
        assert!(row.set_label(Signal::Long));
        assert_eq!(row.label(), Some(Signal::Long));

        // Second write is rejected and the original label survives
        assert!(!row.set_label(Signal::Short));
        assert_eq!(row.label(), Some(Signal::Long));
    }

    #[test]
    fn test_trade_action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TradeAction::Buy).unwrap(),
            "\"buy\""
        );
        assert_eq!(
            serde_json::to_string(&TradeAction::Sell).unwrap(),
            "\"sell\""
        );
    }

    #[test]
    fn test_trade_report_payload_shape() {
        let report = TradeReport {
            symbol: "EURUSD".to_string(),
            action: TradeAction::Buy,
            volume: 0.10,
            price: 1.1000,
            sl: 1.0950,
            tp: 1.1100,
            ticket: 42,
            balance: 10000.0,
            equity: 10000.0,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["action"], "buy");
        assert_eq!(value["ticket"], 42);
        assert_eq!(value["symbol"], "EURUSD");
    }
}
