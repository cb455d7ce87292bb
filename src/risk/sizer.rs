use thiserror::Error;

/// Broker-reported contract data for the traded instrument.
#[derive(Debug, Clone)]
pub struct InstrumentSpec {
    pub pip_size: f64,
    pub tick_size: f64,
    pub tick_value: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub size_step: f64,
    /// Margin required per 1.0 of size.
    pub margin_per_unit: f64,
}

impl InstrumentSpec {
    /// Account-currency value of a one-pip move per 1.0 of size.
    pub fn pip_value(&self) -> f64 {
        self.tick_value * (self.pip_size / self.tick_size)
    }

    fn is_valid(&self) -> bool {
        self.pip_size > 0.0
            && self.tick_size > 0.0
            && self.tick_value > 0.0
            && self.size_step > 0.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("invalid instrument data (pip/tick sizes and tick value must be positive)")]
    InvalidInstrumentData,
    #[error("computed size rounds to zero")]
    ZeroResult,
    #[error("insufficient margin: need {required:.2}, have {available:.2}")]
    InsufficientMargin { required: f64, available: f64 },
}

/// Converts a risk percentage and a stop distance into a tradable size.
#[derive(Debug, Clone)]
pub struct RiskSizer {
    risk_percent: f64,
}

impl RiskSizer {
    pub fn new(risk_percent: f64) -> Self {
        Self { risk_percent }
    }

    pub fn risk_percent(&self) -> f64 {
        self.risk_percent
    }

    /// Size such that losing `stop_loss_pips` costs at most
    /// `risk_percent` of `balance`.
    ///
    /// The raw size is floored to the nearest `size_step` (never rounded
    /// up, so floor-rounding cannot over-risk) and clamped to the
    /// instrument's `[min_size, max_size]` bounds.
    pub fn size(
        &self,
        spec: &InstrumentSpec,
        balance: f64,
        stop_loss_pips: f64,
        available_margin: f64,
    ) -> Result<f64, SizingError> {
        if !spec.is_valid() {
            return Err(SizingError::InvalidInstrumentData);
        }
        if stop_loss_pips <= 0.0 {
            return Err(SizingError::InvalidInstrumentData);
        }

        let risk_amount = balance * self.risk_percent / 100.0;
        let raw = risk_amount / (stop_loss_pips * spec.pip_value());

        let floored = (raw / spec.size_step).floor() * spec.size_step;
        if floored <= 0.0 {
            return Err(SizingError::ZeroResult);
        }

        let size = floored.clamp(spec.min_size, spec.max_size);
        self.check_margin(spec, size, available_margin)?;

        Ok(size)
    }

    /// Minimum tradable size, margin permitting. The fallback entry path
    /// when the risk-derived size rounds to zero.
    pub fn fallback_min_size(
        &self,
        spec: &InstrumentSpec,
        available_margin: f64,
    ) -> Result<f64, SizingError> {
        if !spec.is_valid() {
            return Err(SizingError::InvalidInstrumentData);
        }
        self.check_margin(spec, spec.min_size, available_margin)?;
        Ok(spec.min_size)
    }

    fn check_margin(
        &self,
        spec: &InstrumentSpec,
        size: f64,
        available_margin: f64,
    ) -> Result<(), SizingError> {
        let required = size * spec.margin_per_unit;
        if required > available_margin {
            return Err(SizingError::InsufficientMargin {
                required,
                available: available_margin,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forex_spec() -> InstrumentSpec {
        InstrumentSpec {
            pip_size: 0.0001,
            tick_size: 0.00001,
            tick_value: 1.0,
            min_size: 0.01,
            max_size: 100.0,
            size_step: 0.01,
            margin_per_unit: 1000.0,
        }
    }

    #[test]
    fn test_pip_value_derivation() {
        let spec = forex_spec();
        // tick_value 1.0 per 0.00001 tick => 10.0 per 0.0001 pip
        assert!((spec.pip_value() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_basic_sizing() {
        let sizer = RiskSizer::new(1.0);
        let spec = forex_spec();

        // Risk 1% of 10_000 = 100; stop 50 pips at 10/pip => raw 0.2
        let size = sizer.size(&spec, 10000.0, 50.0, 100000.0).unwrap();
        assert!((size - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_size_floors_to_step_never_up() {
        let sizer = RiskSizer::new(1.0);
        let spec = forex_spec();

        // raw = 100 / (43 * 10) = 0.2325... => floors to 0.23
        let size = sizer.size(&spec, 10000.0, 43.0, 100000.0).unwrap();
        assert!((size - 0.23).abs() < 1e-9);

        // Floored size never risks more than the requested fraction
        let worst_loss = size * 43.0 * spec.pip_value();
        assert!(worst_loss <= 10000.0 * 1.0 / 100.0 + 1e-9);
    }

    #[test]
    fn test_size_is_a_multiple_of_step() {
        let sizer = RiskSizer::new(2.5);
        let spec = forex_spec();

        for stop in [10.0, 17.0, 33.0, 80.0] {
            let size = sizer.size(&spec, 25000.0, stop, 1_000_000.0).unwrap();
            let steps = size / spec.size_step;
            assert!(
                (steps - steps.round()).abs() < 1e-6,
                "size {} not a step multiple for stop {}",
                size,
                stop
            );
            assert!(size >= spec.min_size && size <= spec.max_size);
        }
    }

    #[test]
    fn test_clamps_to_max_size() {
        let sizer = RiskSizer::new(50.0);
        let mut spec = forex_spec();
        spec.max_size = 1.0;

        let size = sizer.size(&spec, 1_000_000.0, 10.0, f64::MAX).unwrap();
        assert_eq!(size, 1.0);
    }

    #[test]
    fn test_invalid_instrument_data() {
        let sizer = RiskSizer::new(1.0);

        let mut spec = forex_spec();
        spec.pip_size = 0.0;
        assert_eq!(
            sizer.size(&spec, 10000.0, 50.0, 100000.0),
            Err(SizingError::InvalidInstrumentData)
        );

        let mut spec = forex_spec();
        spec.tick_value = -1.0;
        assert_eq!(
            sizer.size(&spec, 10000.0, 50.0, 100000.0),
            Err(SizingError::InvalidInstrumentData)
        );

        let spec = forex_spec();
        assert_eq!(
            sizer.size(&spec, 10000.0, 0.0, 100000.0),
            Err(SizingError::InvalidInstrumentData)
        );
    }

    #[test]
    fn test_zero_result() {
        let sizer = RiskSizer::new(0.01);
        let spec = forex_spec();

        // Risk 0.01% of 100 = 0.01; stop 500 pips => raw 0.000002 => floors to 0
        assert_eq!(
            sizer.size(&spec, 100.0, 500.0, 100000.0),
            Err(SizingError::ZeroResult)
        );
    }

    #[test]
    fn test_insufficient_margin() {
        let sizer = RiskSizer::new(1.0);
        let spec = forex_spec();

        // size 0.2 needs 200 of margin, only 50 available
        let result = sizer.size(&spec, 10000.0, 50.0, 50.0);
        assert!(matches!(
            result,
            Err(SizingError::InsufficientMargin { .. })
        ));
    }

    #[test]
    fn test_fallback_min_size() {
        let sizer = RiskSizer::new(1.0);
        let spec = forex_spec();

        assert_eq!(sizer.fallback_min_size(&spec, 100.0), Ok(0.01));

        // min size 0.01 needs 10 of margin
        assert!(matches!(
            sizer.fallback_min_size(&spec, 5.0),
            Err(SizingError::InsufficientMargin { .. })
        ));
    }

    #[test]
    fn test_never_exceeds_requested_risk() {
        let spec = forex_spec();
        for risk in [0.5, 1.0, 2.0, 5.0] {
            let sizer = RiskSizer::new(risk);
            for stop in [5.0, 20.0, 75.0] {
                let balance = 10000.0;
                match sizer.size(&spec, balance, stop, f64::MAX) {
                    Ok(size) => {
                        let worst_loss = size * stop * spec.pip_value();
                        assert!(
                            worst_loss <= balance * risk / 100.0 + 1e-9,
                            "risk {} stop {} over-risks: {}",
                            risk,
                            stop,
                            worst_loss
                        );
                    }
                    Err(SizingError::ZeroResult) => {}
                    Err(e) => panic!("unexpected sizing error: {}", e),
                }
            }
        }
    }
}
