use crate::history::FeatureHistoryBuffer;
use crate::models::Signal;

/// Labels history rows once their forward horizon has fully elapsed.
///
/// After each insert, the row `lookahead` bars behind the newest one has
/// exactly `lookahead` later bars available, so its realized forward move
/// is known without reading anything past the current bar. Moves smaller
/// than the neutral zone label `Neutral` and are never revisited.
#[derive(Debug, Clone)]
pub struct DelayedLabeler {
    lookahead: usize,
    neutral_zone_pips: f64,
    pip_size: f64,
}

impl DelayedLabeler {
    pub fn new(lookahead: usize, neutral_zone_pips: f64, pip_size: f64) -> Self {
        Self {
            lookahead,
            neutral_zone_pips,
            pip_size,
        }
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Label the row that matured with the newest insert, if any.
    ///
    /// No-op (returns None) while the history is shorter than the
    /// lookahead horizon, and on rows that already carry a label.
    pub fn label_matured(&self, history: &mut FeatureHistoryBuffer) -> Option<Signal> {
        if history.len() <= self.lookahead {
            return None;
        }

        let newest_close = history.at(0)?.close;
        let target = history.at_mut(self.lookahead)?;

        let move_pips = (newest_close - target.close).abs() / self.pip_size;
        let label = if move_pips < self.neutral_zone_pips {
            Signal::Neutral
        } else if newest_close > target.close {
            Signal::Long
        } else {
            Signal::Short
        };

        if target.set_label(label) {
            Some(label)
        } else {
            None
        }
    }
}
