//! Engine configuration

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::types::Timeframe;

/// Flat configuration for the whole engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbols to trade (e.g. "EURUSD")
    pub instruments: Vec<String>,
    /// Working bar timeframe for analytics and entries
    pub timeframe: Timeframe,
    /// Percent of account equity risked per trade
    pub risk_percent: f64,
    /// Drawdown from the equity high-water mark that halts new entries (percent)
    pub max_daily_drawdown_percent: f64,
    /// ADR lookback period in days
    pub adr_period_days: i64,
    /// Minimum completed bars between trades on the same instrument
    pub min_bars_between_trades: u32,
    /// Enable the session time filter
    pub time_filter_enabled: bool,
    /// Allowed UTC weekdays when the time filter is on
    pub allowed_weekdays: Vec<Weekday>,
    /// Session start hour (UTC, inclusive)
    pub start_hour: u32,
    /// Session end hour (UTC, exclusive)
    pub end_hour: u32,
    /// Enable the economic-news filter
    pub news_filter_enabled: bool,
    /// Close positions when price crosses back over VWAP
    pub crossover_exit_enabled: bool,
    /// Number of volume-profile bins per session
    pub profile_bins: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: vec!["EURUSD".to_string()],
            timeframe: Timeframe::M5,
            risk_percent: 1.0,
            max_daily_drawdown_percent: 10.0,
            adr_period_days: 14,
            min_bars_between_trades: 10,
            time_filter_enabled: false,
            allowed_weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start_hour: 7,
            end_hour: 20,
            news_filter_enabled: false,
            crossover_exit_enabled: true,
            profile_bins: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.instruments, config.instruments);
        assert_eq!(parsed.timeframe, config.timeframe);
        assert_eq!(parsed.profile_bins, config.profile_bins);
    }
}
