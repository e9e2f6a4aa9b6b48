//! Daily drawdown governor
//!
//! Tracks the equity high-water mark and halts new entries once the
//! drawdown from it exceeds the configured percentage. The mark resets
//! once per 24-hour window measured from the last reset, independent of
//! calendar day boundaries. A halt suppresses entries only; management
//! of existing positions continues.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DrawdownGovernor {
    max_drawdown_percent: f64,
    high_water_mark: f64,
    reset_at: DateTime<Utc>,
    halted: bool,
}

impl DrawdownGovernor {
    pub fn new(max_drawdown_percent: f64, now: DateTime<Utc>) -> Self {
        Self {
            max_drawdown_percent,
            high_water_mark: 0.0,
            reset_at: now,
            halted: false,
        }
    }

    /// Evaluate at the start of a cycle; returns whether entries are halted
    pub fn update(&mut self, now: DateTime<Utc>, equity: f64) -> bool {
        if now >= self.reset_at + Duration::hours(24) {
            if self.halted {
                info!("drawdown halt cleared on daily reset");
            }
            self.high_water_mark = equity;
            self.reset_at = now;
            self.halted = false;
            return false;
        }

        if equity > self.high_water_mark {
            self.high_water_mark = equity;
        }

        if !self.halted && self.high_water_mark > 0.0 {
            let drawdown_pct = (self.high_water_mark - equity) / self.high_water_mark * 100.0;
            if drawdown_pct > self.max_drawdown_percent {
                warn!(
                    "drawdown {:.2}% exceeds {:.2}% limit - halting new entries",
                    drawdown_pct, self.max_drawdown_percent
                );
                self.halted = true;
            }
        }

        self.halted
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn high_water_mark(&self) -> f64 {
        self.high_water_mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_halts_when_drawdown_exceeds_threshold() {
        let mut governor = DrawdownGovernor::new(10.0, start());
        assert!(!governor.update(start(), 10_000.0));
        // 11% down from the mark
        assert!(governor.update(start() + Duration::hours(1), 8_900.0));
        assert!(governor.is_halted());
    }

    #[test]
    fn test_exact_threshold_does_not_halt() {
        let mut governor = DrawdownGovernor::new(10.0, start());
        governor.update(start(), 10_000.0);
        // Exactly 10% is not an excess
        assert!(!governor.update(start() + Duration::hours(1), 9_000.0));
    }

    #[test]
    fn test_high_water_mark_ratchets_up() {
        let mut governor = DrawdownGovernor::new(10.0, start());
        governor.update(start(), 10_000.0);
        governor.update(start() + Duration::hours(1), 12_000.0);
        assert_eq!(governor.high_water_mark(), 12_000.0);
        // 10% below the new mark, over 10% below nothing else
        assert!(!governor.update(start() + Duration::hours(2), 10_900.0));
        assert!(governor.update(start() + Duration::hours(3), 10_700.0));
    }

    #[test]
    fn test_halt_persists_until_reset_even_if_equity_recovers() {
        let mut governor = DrawdownGovernor::new(10.0, start());
        governor.update(start(), 10_000.0);
        assert!(governor.update(start() + Duration::hours(1), 8_000.0));
        assert!(governor.update(start() + Duration::hours(2), 9_900.0));
    }

    #[test]
    fn test_unhalts_at_first_cycle_after_24h() {
        let mut governor = DrawdownGovernor::new(10.0, start());
        governor.update(start(), 10_000.0);
        assert!(governor.update(start() + Duration::hours(1), 8_000.0));
        // Still inside the window
        assert!(governor.update(start() + Duration::hours(23), 8_000.0));
        // First cycle at/after the boundary resets the mark to current equity
        assert!(!governor.update(start() + Duration::hours(24), 8_000.0));
        assert_eq!(governor.high_water_mark(), 8_000.0);
    }

    #[test]
    fn test_reset_window_measured_from_last_reset() {
        let mut governor = DrawdownGovernor::new(10.0, start());
        governor.update(start() + Duration::hours(30), 10_000.0);
        // The reset at +30h restarts the window; +47h is inside it
        assert!(governor.update(start() + Duration::hours(47), 8_000.0));
        // +54h crosses it
        assert!(!governor.update(start() + Duration::hours(54), 8_000.0));
    }
}
