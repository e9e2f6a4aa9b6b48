//! Entry signal evaluation
//!
//! Compares live quotes against the instrument's VWAP and volume-node
//! bands, builds the stop/target bracket from ADR, sizes the order and
//! places it through the execution port. Long and short are mutually
//! exclusive per bar; long is evaluated first and wins if both somehow
//! hold.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::filters::{FrequencyFilter, NewsFilter, TimeFilter};
use crate::ports::{CalendarService, ExecutionService};
use crate::risk::RiskSizer;
use crate::state::InstrumentState;
use crate::types::{round_price, InstrumentSpec, Quote, Side};

/// Initial stop distance as a fraction of ADR (this is 1R)
pub const STOP_ADR_FRACTION: f64 = 0.10;
/// Target distance as a fraction of ADR
pub const TARGET_ADR_FRACTION: f64 = 0.50;

/// Entry decision engine, evaluated once per new completed bar
pub struct SignalEngine {
    pub time_filter: TimeFilter,
    pub news_filter: NewsFilter,
    pub frequency_filter: FrequencyFilter,
    pub sizer: RiskSizer,
}

impl SignalEngine {
    /// Directional condition against VWAP and the volume-node bands
    pub fn entry_side(state: &InstrumentState, quote: &Quote) -> Option<Side> {
        if quote.ask > state.vwap && (quote.bid > state.hvn_upper || quote.bid > state.lvn_upper) {
            return Some(Side::Long);
        }
        if quote.bid < state.vwap && (quote.ask < state.hvn_lower || quote.ask < state.lvn_lower) {
            return Some(Side::Short);
        }
        None
    }

    /// Evaluate a freshly completed bar and place an order when the
    /// analytics, filters and constraints all line up
    ///
    /// On confirmed placement the instrument is marked as holding a
    /// trade; on rejection state is left untouched so the signal is
    /// naturally retried on the next bar.
    #[allow(clippy::too_many_arguments)]
    pub fn on_bar_close(
        &self,
        state: &mut InstrumentState,
        bar_time: DateTime<Utc>,
        now: DateTime<Utc>,
        quote: &Quote,
        spec: &InstrumentSpec,
        equity: f64,
        calendar: &dyn CalendarService,
        execution: &dyn ExecutionService,
    ) -> Option<Side> {
        if state.has_open_trade {
            return None;
        }
        if !state.analytics_ready() {
            debug!("{}: analytics unavailable, skipping entry check", state.symbol);
            return None;
        }

        if !self.time_filter.passes(now) {
            debug!("{}: outside trading session", state.symbol);
            return None;
        }
        if !self.frequency_filter.passes(state, bar_time) {
            debug!("{}: trade frequency cooldown active", state.symbol);
            return None;
        }
        if !self.news_filter.passes(&state.symbol, now, calendar) {
            info!("{}: blocked by news filter", state.symbol);
            return None;
        }

        let side = Self::entry_side(state, quote)?;

        let stop_distance = STOP_ADR_FRACTION * state.adr * spec.price_increment;
        let target_distance = TARGET_ADR_FRACTION * state.adr * spec.price_increment;

        let (entry, stop, target) = match side {
            Side::Long => {
                let entry = quote.ask;
                (
                    entry,
                    round_price(entry - stop_distance, spec.price_precision),
                    round_price(entry + target_distance, spec.price_precision),
                )
            }
            Side::Short => {
                let entry = quote.bid;
                (
                    entry,
                    round_price(entry + stop_distance, spec.price_precision),
                    round_price(entry - target_distance, spec.price_precision),
                )
            }
        };

        if (entry - stop).abs() < spec.min_stop_distance
            || (target - entry).abs() < spec.min_stop_distance
        {
            warn!(
                "{}: {} bracket inside minimum stop distance (entry {:.5}, stop {:.5}, target {:.5}), rejecting",
                state.symbol, side, entry, stop, target
            );
            return None;
        }

        let size = self.sizer.size(equity, STOP_ADR_FRACTION * state.adr, spec);
        if size <= 0.0 {
            warn!("{}: sized to zero, rejecting signal", state.symbol);
            return None;
        }

        match execution.open_position(&state.symbol, side, size, entry, stop, target) {
            Ok(position_id) => {
                info!(
                    "ENTRY {} {} size {:.2} @ {:.5} | stop {:.5} | target {:.5} | id {}",
                    state.symbol, side, size, entry, stop, target, position_id
                );
                state.has_open_trade = true;
                state.last_trade_bar_time = Some(bar_time);
                Some(side)
            }
            Err(e) => {
                warn!("{}: order rejected: {}", state.symbol, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ready_state() -> InstrumentState {
        let mut state = InstrumentState::new("EURUSD");
        state.vwap = 1.1005;
        state.adr = 100.0;
        state.poc_price = 1.1004;
        state.hvn_lower = 1.1003;
        state.hvn_upper = 1.1007;
        state.lvn_lower = 1.1000;
        state.lvn_upper = 1.1009;
        state
    }

    fn quote(bid: f64, ask: f64) -> Quote {
        Quote {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            bid,
            ask,
        }
    }

    #[test]
    fn test_long_above_vwap_and_upper_band() {
        let state = ready_state();
        assert_eq!(
            SignalEngine::entry_side(&state, &quote(1.1011, 1.1012)),
            Some(Side::Long)
        );
    }

    #[test]
    fn test_long_requires_band_breach() {
        let state = ready_state();
        // Above VWAP but between the bands on the bid side
        assert_eq!(SignalEngine::entry_side(&state, &quote(1.1006, 1.1007)), None);
    }

    #[test]
    fn test_short_below_vwap_and_lower_band() {
        let state = ready_state();
        assert_eq!(
            SignalEngine::entry_side(&state, &quote(1.0998, 1.0999)),
            Some(Side::Short)
        );
    }

    #[test]
    fn test_no_signal_between_bands() {
        let state = ready_state();
        assert_eq!(SignalEngine::entry_side(&state, &quote(1.1004, 1.1005)), None);
    }

    #[test]
    fn test_long_wins_when_both_sides_hold() {
        // A wide spread straddling VWAP with inverted bands makes both
        // conditions true at once; long is evaluated first
        let mut state = ready_state();
        state.hvn_lower = 1.2000;
        state.hvn_upper = 1.0990;
        state.lvn_lower = 1.2000;
        state.lvn_upper = 1.0990;
        let wide = quote(1.1000, 1.1010);
        assert!(wide.bid < state.vwap && wide.ask > state.vwap);
        assert_eq!(SignalEngine::entry_side(&state, &wide), Some(Side::Long));
    }
}
