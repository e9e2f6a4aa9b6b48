//! Session-anchored volume-weighted average price

use tracing::debug;

use crate::types::{round_price, Bar};

/// Compute VWAP over a session's bars, rounded to the instrument's
/// quoted precision
///
/// Returns 0.0 ("unavailable") for an empty window or zero total volume.
/// Callers must treat 0.0 as "do not trade this instrument this cycle",
/// never as a real price.
pub fn session_vwap(bars: &[Bar], precision: u32) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }

    let mut sum_pv = 0.0;
    let mut sum_v = 0u64;

    for bar in bars {
        sum_pv += bar.typical_price() * bar.volume as f64;
        sum_v += bar.volume;
    }

    if sum_v == 0 {
        debug!("VWAP window has zero total volume");
        return 0.0;
    }

    round_price(sum_pv / sum_v as f64, precision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64, close: f64, volume: u64) -> Bar {
        Bar {
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: low,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn test_vwap_two_bars() {
        // typical prices 1.1037 and 1.1048 -> volume-weighted 1.1044
        let bars = vec![
            bar(1.1050, 1.1020, 1.1040, 100),
            bar(1.1060, 1.1030, 1.1055, 200),
        ];
        assert_eq!(session_vwap(&bars, 4), 1.1044);
    }

    #[test]
    fn test_vwap_within_session_range() {
        let bars = vec![
            bar(1.2010, 1.1990, 1.2000, 300),
            bar(1.2030, 1.2000, 1.2025, 150),
            bar(1.2020, 1.1985, 1.1995, 450),
        ];
        let vwap = session_vwap(&bars, 5);
        let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        assert!(vwap >= low && vwap <= high);
    }

    #[test]
    fn test_vwap_sentinel_on_empty_window() {
        assert_eq!(session_vwap(&[], 4), 0.0);
    }

    #[test]
    fn test_vwap_sentinel_on_zero_volume() {
        let bars = vec![bar(1.1050, 1.1020, 1.1040, 0)];
        assert_eq!(session_vwap(&bars, 4), 0.0);
    }
}
