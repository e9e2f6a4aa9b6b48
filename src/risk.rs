//! Risk-based position sizing

use tracing::warn;

use crate::types::InstrumentSpec;

/// Converts a per-trade risk percentage and a stop distance into an
/// order size respecting the instrument's constraints
#[derive(Debug, Clone, Copy)]
pub struct RiskSizer {
    /// Percent of equity risked per trade
    pub risk_percent: f64,
}

impl RiskSizer {
    pub fn new(risk_percent: f64) -> Self {
        Self { risk_percent }
    }

    /// Order size for the given equity and stop distance in increments
    ///
    /// Rounded to the nearest size-step multiple, then clamped to the
    /// instrument's limits. Returns the 0.0 sentinel on a sizing
    /// misconfiguration; callers must not place a zero-size order.
    pub fn size(&self, equity: f64, stop_increments: f64, spec: &InstrumentSpec) -> f64 {
        if spec.increment_value <= 0.0 {
            warn!("non-positive increment value, refusing to size");
            return 0.0;
        }
        if equity <= 0.0 || stop_increments <= 0.0 {
            return 0.0;
        }

        let risk_amount = equity * self.risk_percent / 100.0;
        let raw = risk_amount / (stop_increments * spec.increment_value);

        let stepped = if spec.size_step > 0.0 {
            (raw / spec.size_step).round() * spec.size_step
        } else {
            raw
        };

        stepped.clamp(spec.min_size, spec.max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> InstrumentSpec {
        InstrumentSpec {
            price_increment: 0.0001,
            price_precision: 4,
            increment_value: 1.0,
            size_step: 0.01,
            min_size: 0.01,
            max_size: 100.0,
            min_stop_distance: 0.0005,
        }
    }

    #[test]
    fn test_size_from_risk_amount() {
        // 1% of 10000 = 100 risked over 50 increments at 1.0 each -> 2.0
        let sizer = RiskSizer::new(1.0);
        assert_eq!(sizer.size(10_000.0, 50.0, &spec()), 2.0);
    }

    #[test]
    fn test_size_is_step_multiple_within_limits() {
        let sizer = RiskSizer::new(1.5);
        let spec = spec();
        for (equity, stop) in [
            (10_000.0, 37.0),
            (2_543.0, 12.5),
            (100_000.0, 80.0),
            (999.0, 3.0),
        ] {
            let size = sizer.size(equity, stop, &spec);
            let steps = size / spec.size_step;
            assert!((steps - steps.round()).abs() < 1e-6, "size {} off-step", size);
            assert!(size >= spec.min_size && size <= spec.max_size);
        }
    }

    #[test]
    fn test_size_clamped_to_max() {
        let sizer = RiskSizer::new(50.0);
        assert_eq!(sizer.size(1_000_000.0, 1.0, &spec()), 100.0);
    }

    #[test]
    fn test_size_clamped_to_min() {
        let sizer = RiskSizer::new(0.001);
        assert_eq!(sizer.size(100.0, 500.0, &spec()), 0.01);
    }

    #[test]
    fn test_zero_sentinel_on_misconfigured_increment_value() {
        let sizer = RiskSizer::new(1.0);
        let mut bad = spec();
        bad.increment_value = 0.0;
        assert_eq!(sizer.size(10_000.0, 50.0, &bad), 0.0);
    }

    #[test]
    fn test_zero_sentinel_on_zero_stop_distance() {
        let sizer = RiskSizer::new(1.0);
        assert_eq!(sizer.size(10_000.0, 0.0, &spec()), 0.0);
    }
}
