//! Per-tick update cycle
//!
//! The host environment invokes [`Orchestrator::on_price_update`] once
//! per incoming price update. Heavy analytics (VWAP, ADR, volume
//! profile) recompute only when a new completed bar shows up, detected
//! by comparing the latest bar's open time to the previously seen one.
//! Position management runs on every invocation; the drawdown governor
//! gates the whole cycle. There is exactly one logical thread of
//! control, so no locking anywhere.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::analytics::{average_daily_range, build_profile, derive_bands, session_vwap};
use crate::config::EngineConfig;
use crate::filters::{FrequencyFilter, NewsFilter, TimeFilter};
use crate::governor::DrawdownGovernor;
use crate::manager::{ManageOutcome, TradeManager};
use crate::ports::{
    AccountInfoProvider, CalendarService, ExecutionService, InstrumentSpecProvider,
    MarketDataProvider,
};
use crate::risk::RiskSizer;
use crate::signal::SignalEngine;
use crate::state::InstrumentState;
use crate::types::Timeframe;

pub struct Orchestrator {
    config: EngineConfig,
    states: BTreeMap<String, InstrumentState>,
    last_processed_bar: BTreeMap<String, DateTime<Utc>>,
    /// Most recent Monday 00:00 UTC at construction; bounds "this week's"
    /// bars for VWAP and the volume profile
    session_anchor: DateTime<Utc>,
    signal_engine: SignalEngine,
    trade_manager: TradeManager,
    governor: DrawdownGovernor,
    market_data: Box<dyn MarketDataProvider>,
    account: Box<dyn AccountInfoProvider>,
    specs: Box<dyn InstrumentSpecProvider>,
    execution: Box<dyn ExecutionService>,
    calendar: Box<dyn CalendarService>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        now: DateTime<Utc>,
        market_data: Box<dyn MarketDataProvider>,
        account: Box<dyn AccountInfoProvider>,
        specs: Box<dyn InstrumentSpecProvider>,
        execution: Box<dyn ExecutionService>,
        calendar: Box<dyn CalendarService>,
    ) -> Self {
        let states = config
            .instruments
            .iter()
            .map(|symbol| (symbol.clone(), InstrumentState::new(symbol)))
            .collect();

        let signal_engine = SignalEngine {
            time_filter: TimeFilter {
                enabled: config.time_filter_enabled,
                allowed_weekdays: config.allowed_weekdays.clone(),
                start_hour: config.start_hour,
                end_hour: config.end_hour,
            },
            news_filter: NewsFilter {
                enabled: config.news_filter_enabled,
            },
            frequency_filter: FrequencyFilter {
                min_bars_between_trades: config.min_bars_between_trades,
                timeframe: config.timeframe,
            },
            sizer: RiskSizer::new(config.risk_percent),
        };

        let trade_manager = TradeManager {
            crossover_exit_enabled: config.crossover_exit_enabled,
        };

        let governor = DrawdownGovernor::new(config.max_daily_drawdown_percent, now);

        Self {
            session_anchor: week_anchor(now),
            states,
            last_processed_bar: BTreeMap::new(),
            signal_engine,
            trade_manager,
            governor,
            market_data,
            account,
            specs,
            execution,
            calendar,
            config,
        }
    }

    pub fn state(&self, symbol: &str) -> Option<&InstrumentState> {
        self.states.get(symbol)
    }

    pub fn is_halted(&self) -> bool {
        self.governor.is_halted()
    }

    pub fn session_anchor(&self) -> DateTime<Utc> {
        self.session_anchor
    }

    /// Run one full cycle: governor, open-position management, then the
    /// per-instrument bar update and entry evaluation
    pub fn on_price_update(&mut self, now: DateTime<Utc>) {
        let equity = match self.account.equity() {
            Ok(equity) => equity,
            Err(e) => {
                warn!("equity unavailable, skipping cycle: {}", e);
                return;
            }
        };

        let halted = self.governor.update(now, equity);

        self.manage_open_positions();

        for symbol in self.config.instruments.clone() {
            self.update_instrument(&symbol, now, equity, halted);
        }
    }

    /// Trailing-stop ladder and crossover exit over every live position,
    /// then reconcile bookkeeping against the venue's position set
    fn manage_open_positions(&mut self) {
        let positions = match self.execution.open_positions() {
            Ok(positions) => positions,
            Err(e) => {
                warn!("position fetch failed, skipping management: {}", e);
                return;
            }
        };

        for position in &positions {
            let Some(state) = self.states.get(&position.symbol) else {
                continue;
            };
            let spec = match self.specs.spec(&position.symbol) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!("{}: spec unavailable: {}", position.symbol, e);
                    continue;
                }
            };
            let quote = match self.market_data.quote(&position.symbol) {
                Ok(quote) => quote,
                Err(e) => {
                    warn!("{}: quote unavailable: {}", position.symbol, e);
                    continue;
                }
            };

            let outcome =
                self.trade_manager
                    .manage(position, state, &spec, &quote, self.execution.as_ref());
            if outcome == ManageOutcome::Closed {
                if let Some(state) = self.states.get_mut(&position.symbol) {
                    state.has_open_trade = false;
                }
            }
        }

        // A position may have closed via stop or target outside this
        // engine's control; the venue's live set is the truth
        match self.execution.open_positions() {
            Ok(live) => {
                for (symbol, state) in self.states.iter_mut() {
                    state.has_open_trade = live.iter().any(|p| &p.symbol == symbol);
                }
            }
            Err(e) => warn!("reconcile skipped: {}", e),
        }
    }

    /// Recompute analytics on a new completed bar, then evaluate entries
    fn update_instrument(&mut self, symbol: &str, now: DateTime<Utc>, equity: f64, halted: bool) {
        let bars = match self
            .market_data
            .bars(symbol, self.config.timeframe, self.session_anchor, now)
        {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => {
                debug!("{}: no session bars", symbol);
                return;
            }
            Err(e) => {
                warn!("{}: bar fetch failed: {}", symbol, e);
                return;
            }
        };

        let Some(latest) = bars.last() else {
            return;
        };
        let latest_open = latest.open_time;

        if self.last_processed_bar.get(symbol) == Some(&latest_open) {
            return;
        }
        self.last_processed_bar.insert(symbol.to_string(), latest_open);

        let spec = match self.specs.spec(symbol) {
            Ok(spec) => spec,
            Err(e) => {
                warn!("{}: spec unavailable: {}", symbol, e);
                return;
            }
        };

        // Daily bars ending the prior day
        let day_start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        let daily_from = day_start - Duration::days(self.config.adr_period_days);
        let daily_to = day_start - Duration::seconds(1);
        let adr = match self
            .market_data
            .bars(symbol, Timeframe::D1, daily_from, daily_to)
        {
            Ok(daily) => average_daily_range(&daily, spec.price_increment),
            Err(e) => {
                warn!("{}: daily bars unavailable: {}", symbol, e);
                0.0
            }
        };

        let Some(state) = self.states.get_mut(symbol) else {
            return;
        };
        state.vwap = session_vwap(&bars, spec.price_precision);
        state.adr = adr;

        // A degenerate session keeps the previous bands
        match build_profile(&bars, self.config.profile_bins) {
            Ok(profile) => {
                let bands = derive_bands(&profile, spec.price_precision);
                state.apply_bands(&bands);
            }
            Err(e) => warn!("{}: profile update skipped: {}", symbol, e),
        }

        debug!(
            "{}: bar {} | vwap {:.5} | adr {:.2} | poc {:.5} | hvn [{:.5}, {:.5}] | lvn [{:.5}, {:.5}]",
            symbol,
            latest_open,
            state.vwap,
            state.adr,
            state.poc_price,
            state.hvn_lower,
            state.hvn_upper,
            state.lvn_lower,
            state.lvn_upper
        );

        if halted {
            debug!("{}: entries halted by drawdown governor", symbol);
            return;
        }

        let quote = match self.market_data.quote(symbol) {
            Ok(quote) => quote,
            Err(e) => {
                warn!("{}: quote unavailable: {}", symbol, e);
                return;
            }
        };

        self.signal_engine.on_bar_close(
            state,
            latest_open,
            now,
            &quote,
            &spec,
            equity,
            self.calendar.as_ref(),
            self.execution.as_ref(),
        );
    }
}

/// Most recent Monday 00:00 UTC at or before `now`
pub fn week_anchor(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_back = now.weekday().num_days_from_monday() as i64;
    let monday = now.date_naive() - Duration::days(days_back);
    Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_week_anchor_mid_week() {
        // Thursday 2024-01-04 15:30 -> Monday 2024-01-01 00:00
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 15, 30, 0).unwrap();
        assert_eq!(
            week_anchor(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_week_anchor_on_monday_is_same_day() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(week_anchor(now), now);
    }

    #[test]
    fn test_week_anchor_on_sunday_reaches_back() {
        // Sunday 2024-01-07 -> Monday 2024-01-01
        let now = Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap();
        assert_eq!(
            week_anchor(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
