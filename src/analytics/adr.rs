//! Average daily range

use crate::types::Bar;

/// Mean high-low range across the given daily bars, expressed in
/// price-increment units and rounded to 2 decimals
///
/// Partial data is allowed: the mean runs over however many days were
/// retrievable, which may be fewer than the configured period. Returns
/// 0.0 for an empty window or a non-positive increment.
pub fn average_daily_range(daily_bars: &[Bar], price_increment: f64) -> f64 {
    if daily_bars.is_empty() || price_increment <= 0.0 {
        return 0.0;
    }

    let sum: f64 = daily_bars.iter().map(|b| b.high - b.low).sum();
    let mean = sum / daily_bars.len() as f64;

    ((mean / price_increment) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(high: f64, low: f64) -> Bar {
        Bar {
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: low,
            high,
            low,
            close: high,
            volume: 1000,
        }
    }

    #[test]
    fn test_adr_in_increments() {
        // Ranges of 80 and 120 pips at a 0.0001 increment -> 100.00
        let bars = vec![day(1.1080, 1.1000), day(1.1120, 1.1000)];
        assert_eq!(average_daily_range(&bars, 0.0001), 100.0);
    }

    #[test]
    fn test_adr_partial_window() {
        // Only one retrievable day still yields a value
        let bars = vec![day(1.1050, 1.1000)];
        assert_eq!(average_daily_range(&bars, 0.0001), 50.0);
    }

    #[test]
    fn test_adr_rounds_to_two_decimals() {
        let bars = vec![day(1.10001, 1.10000), day(1.10002, 1.10000)];
        // Mean range 0.000015 -> 0.15 increments
        assert_eq!(average_daily_range(&bars, 0.0001), 0.15);
    }

    #[test]
    fn test_adr_sentinel_on_no_days() {
        assert_eq!(average_daily_range(&[], 0.0001), 0.0);
    }

    #[test]
    fn test_adr_sentinel_on_bad_increment() {
        let bars = vec![day(1.1050, 1.1000)];
        assert_eq!(average_daily_range(&bars, 0.0), 0.0);
    }
}
