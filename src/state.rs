//! Per-instrument analytics and trade bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::ProfileBands;

/// Latest analytics outputs plus open-trade bookkeeping for one instrument
///
/// One record per configured instrument, created at startup and never
/// removed. Mutated only by the orchestrator's per-bar update and by
/// trade-outcome notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentState {
    pub symbol: String,
    /// Session VWAP; 0.0 means unavailable
    pub vwap: f64,
    /// Average daily range in price-increment units; 0.0 means unavailable
    pub adr: f64,
    pub poc_price: f64,
    pub hvn_lower: f64,
    pub hvn_upper: f64,
    pub lvn_lower: f64,
    pub lvn_upper: f64,
    pub has_open_trade: bool,
    /// Open time of the bar that produced the last entry
    pub last_trade_bar_time: Option<DateTime<Utc>>,
}

impl InstrumentState {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            vwap: 0.0,
            adr: 0.0,
            poc_price: 0.0,
            hvn_lower: 0.0,
            hvn_upper: 0.0,
            lvn_lower: 0.0,
            lvn_upper: 0.0,
            has_open_trade: false,
            last_trade_bar_time: None,
        }
    }

    /// Publish freshly derived profile bands
    pub fn apply_bands(&mut self, bands: &ProfileBands) {
        self.poc_price = bands.poc_price;
        self.hvn_lower = bands.hvn_lower;
        self.hvn_upper = bands.hvn_upper;
        self.lvn_lower = bands.lvn_lower;
        self.lvn_upper = bands.lvn_upper;
    }

    /// True when both core analytics carry real values
    pub fn analytics_ready(&self) -> bool {
        self.vwap > 0.0 && self.adr > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_not_ready() {
        let state = InstrumentState::new("EURUSD");
        assert!(!state.analytics_ready());
        assert!(!state.has_open_trade);
        assert!(state.last_trade_bar_time.is_none());
    }

    #[test]
    fn test_apply_bands() {
        let mut state = InstrumentState::new("EURUSD");
        let bands = ProfileBands {
            poc_price: 1.1005,
            hvn_lower: 1.1003,
            hvn_upper: 1.1007,
            lvn_lower: 1.1000,
            lvn_upper: 1.1009,
        };
        state.apply_bands(&bands);
        assert_eq!(state.poc_price, 1.1005);
        assert_eq!(state.lvn_upper, 1.1009);
    }
}
