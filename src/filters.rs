//! Entry gating predicates
//!
//! Three independent filters checked before any entry: session time,
//! scheduled news and per-instrument trade frequency. An entry requires
//! every enabled filter to pass.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use tracing::{debug, warn};

use crate::ports::{CalendarService, EventImportance};
use crate::state::InstrumentState;
use crate::types::Timeframe;

/// Restricts entries to configured UTC weekdays and hours
#[derive(Debug, Clone)]
pub struct TimeFilter {
    pub enabled: bool,
    pub allowed_weekdays: Vec<Weekday>,
    /// Inclusive start hour (UTC)
    pub start_hour: u32,
    /// Exclusive end hour (UTC)
    pub end_hour: u32,
}

impl TimeFilter {
    pub fn passes(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        let weekday_ok = self.allowed_weekdays.contains(&now.weekday());
        let hour = now.hour();
        weekday_ok && hour >= self.start_hour && hour < self.end_hour
    }
}

/// Blocks entries around scheduled economic events
///
/// The instrument's base and quote currencies come from the first three
/// and next three characters of its symbol; any event of at least
/// moderate importance within an hour either side of now blocks. A
/// calendar failure blocks as well.
#[derive(Debug, Clone)]
pub struct NewsFilter {
    pub enabled: bool,
}

impl NewsFilter {
    pub fn passes(&self, symbol: &str, now: DateTime<Utc>, calendar: &dyn CalendarService) -> bool {
        if !self.enabled {
            return true;
        }

        let from = now - Duration::hours(1);
        let to = now + Duration::hours(1);

        for currency in symbol_currencies(symbol) {
            match calendar.events(&currency, from, to) {
                Ok(events) => {
                    if let Some(event) = events
                        .iter()
                        .find(|e| e.importance >= EventImportance::Moderate)
                    {
                        debug!(
                            "news filter blocks {}: {:?} event for {} at {}",
                            symbol, event.importance, currency, event.time
                        );
                        return false;
                    }
                }
                Err(e) => {
                    warn!(
                        "calendar lookup failed for {}: {} - blocking entries",
                        currency, e
                    );
                    return false;
                }
            }
        }

        true
    }
}

/// Base and quote currency codes from a six-letter FX symbol
fn symbol_currencies(symbol: &str) -> Vec<String> {
    let mut currencies = Vec::new();
    if let Some(base) = symbol.get(0..3) {
        currencies.push(base.to_string());
    }
    if let Some(quote) = symbol.get(3..6) {
        currencies.push(quote.to_string());
    }
    currencies
}

/// Enforces a minimum number of completed bars between trades per instrument
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    pub min_bars_between_trades: u32,
    pub timeframe: Timeframe,
}

impl FrequencyFilter {
    pub fn passes(&self, state: &InstrumentState, current_bar_time: DateTime<Utc>) -> bool {
        let Some(last) = state.last_trade_bar_time else {
            return true;
        };

        let bar_seconds = self.timeframe.duration().num_seconds();
        if bar_seconds <= 0 {
            return true;
        }

        let bars_since = (current_bar_time - last).num_seconds() / bar_seconds;
        bars_since >= self.min_bars_between_trades as i64
    }
}
