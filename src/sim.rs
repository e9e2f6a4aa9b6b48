//! In-memory port implementations
//!
//! Single-threaded simulators for every collaborator the engine
//! consumes, used by the integration tests and the replay binary.
//! Fills are bookkept the way a live venue would report them: stop and
//! target hits are applied from incoming quotes via [`SimExecution::apply_quote`]
//! before the engine's next cycle observes the position set.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::ports::{
    AccountInfoProvider, CalendarEvent, CalendarService, ExecutionService, InstrumentSpecProvider,
    MarketDataProvider,
};
use crate::types::{Bar, InstrumentSpec, Position, Quote, Side, Timeframe};

/// Scripted market data: preloaded bars plus a settable current quote
#[derive(Default)]
pub struct SimMarketData {
    bars: RefCell<BTreeMap<(String, Timeframe), Vec<Bar>>>,
    quotes: RefCell<BTreeMap<String, Quote>>,
    /// When set, every bar fetch fails
    pub fail_bars: Cell<bool>,
}

impl SimMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bar(&self, symbol: &str, timeframe: Timeframe, bar: Bar) {
        self.bars
            .borrow_mut()
            .entry((symbol.to_string(), timeframe))
            .or_default()
            .push(bar);
    }

    pub fn set_quote(&self, symbol: &str, quote: Quote) {
        self.quotes.borrow_mut().insert(symbol.to_string(), quote);
    }
}

impl MarketDataProvider for SimMarketData {
    fn bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Bar>> {
        if self.fail_bars.get() {
            return Err(EngineError::DataUnavailable(
                "scripted bar failure".to_string(),
            ));
        }
        Ok(self
            .bars
            .borrow()
            .get(&(symbol.to_string(), timeframe))
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.open_time >= from && b.open_time <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn quote(&self, symbol: &str) -> EngineResult<Quote> {
        self.quotes
            .borrow()
            .get(symbol)
            .copied()
            .ok_or_else(|| EngineError::DataUnavailable(format!("no quote for {}", symbol)))
    }
}

/// Settable account equity
pub struct SimAccount {
    equity: Cell<f64>,
}

impl SimAccount {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            equity: Cell::new(initial_equity),
        }
    }

    pub fn set_equity(&self, equity: f64) {
        self.equity.set(equity);
    }
}

impl AccountInfoProvider for SimAccount {
    fn equity(&self) -> EngineResult<f64> {
        Ok(self.equity.get())
    }
}

/// Fixed per-symbol spec table
#[derive(Default)]
pub struct StaticSpecs {
    specs: RefCell<BTreeMap<String, InstrumentSpec>>,
}

impl StaticSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, symbol: &str, spec: InstrumentSpec) {
        self.specs.borrow_mut().insert(symbol.to_string(), spec);
    }
}

impl InstrumentSpecProvider for StaticSpecs {
    fn spec(&self, symbol: &str) -> EngineResult<InstrumentSpec> {
        self.specs
            .borrow()
            .get(symbol)
            .copied()
            .ok_or_else(|| EngineError::DataUnavailable(format!("no spec for {}", symbol)))
    }
}

/// One closed trade as observed by the sim venue
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub open_price: f64,
    pub close_price: f64,
    /// P&L in price units per unit of size
    pub pnl: f64,
    pub reason: String,
    pub closed_at: DateTime<Utc>,
}

/// Paper execution venue with stop/target fill bookkeeping
#[derive(Default)]
pub struct SimExecution {
    positions: RefCell<Vec<Position>>,
    closed: RefCell<Vec<TradeRecord>>,
    last_quotes: RefCell<BTreeMap<String, Quote>>,
    /// When set, order placement is rejected
    pub reject_orders: Cell<bool>,
    /// When set, stop modifies are rejected
    pub reject_modifies: Cell<bool>,
}

impl SimExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an externally created position (test setup)
    pub fn push_position(&self, position: Position) {
        self.positions.borrow_mut().push(position);
    }

    pub fn open_position_for(&self, symbol: &str) -> Option<Position> {
        self.positions
            .borrow()
            .iter()
            .find(|p| p.symbol == symbol)
            .cloned()
    }

    pub fn closed_trades(&self) -> Vec<TradeRecord> {
        self.closed.borrow().clone()
    }

    /// Apply a quote to the book: fill any stop or target it touches
    ///
    /// Stops are checked before targets, the way a conservative venue
    /// fills a bar that spans both.
    pub fn apply_quote(&self, symbol: &str, quote: &Quote) {
        self.last_quotes
            .borrow_mut()
            .insert(symbol.to_string(), *quote);

        let mut filled = Vec::new();
        self.positions.borrow_mut().retain(|position| {
            if position.symbol != symbol {
                return true;
            }
            let exit = match position.side {
                Side::Long => {
                    if quote.bid <= position.stop_loss {
                        Some((position.stop_loss, "stop"))
                    } else if quote.bid >= position.take_profit {
                        Some((position.take_profit, "target"))
                    } else {
                        None
                    }
                }
                Side::Short => {
                    if quote.ask >= position.stop_loss {
                        Some((position.stop_loss, "stop"))
                    } else if quote.ask <= position.take_profit {
                        Some((position.take_profit, "target"))
                    } else {
                        None
                    }
                }
            };
            match exit {
                Some((price, reason)) => {
                    filled.push((position.clone(), price, reason, quote.time));
                    false
                }
                None => true,
            }
        });

        for (position, price, reason, time) in filled {
            self.record_close(&position, price, reason, time);
        }
    }

    fn record_close(&self, position: &Position, price: f64, reason: &str, time: DateTime<Utc>) {
        let pnl = match position.side {
            Side::Long => price - position.open_price,
            Side::Short => position.open_price - price,
        };
        info!(
            "SIM FILL {} {} {} @ {:.5} | pnl {:+.5}",
            position.symbol, position.side, reason, price, pnl
        );
        self.closed.borrow_mut().push(TradeRecord {
            symbol: position.symbol.clone(),
            side: position.side,
            size: position.size,
            open_price: position.open_price,
            close_price: price,
            pnl,
            reason: reason.to_string(),
            closed_at: time,
        });
    }
}

impl ExecutionService for SimExecution {
    fn open_position(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        entry: f64,
        stop: f64,
        target: f64,
    ) -> EngineResult<Uuid> {
        if self.reject_orders.get() {
            return Err(EngineError::ExecutionRejected(
                "scripted order rejection".to_string(),
            ));
        }
        let open_time = self
            .last_quotes
            .borrow()
            .get(symbol)
            .map(|q| q.time)
            .unwrap_or_default();
        let id = Uuid::new_v4();
        debug!(
            "SIM OPEN {} {} size {:.2} @ {:.5} stop {:.5} target {:.5}",
            symbol, side, size, entry, stop, target
        );
        self.positions.borrow_mut().push(Position {
            id,
            symbol: symbol.to_string(),
            side,
            size,
            open_price: entry,
            stop_loss: stop,
            take_profit: target,
            open_time,
        });
        Ok(id)
    }

    fn modify_stop(&self, position_id: Uuid, new_stop: f64, target: f64) -> EngineResult<()> {
        if self.reject_modifies.get() {
            return Err(EngineError::ExecutionRejected(
                "scripted modify rejection".to_string(),
            ));
        }
        let mut positions = self.positions.borrow_mut();
        let Some(position) = positions.iter_mut().find(|p| p.id == position_id) else {
            return Err(EngineError::ExecutionRejected(format!(
                "unknown position {}",
                position_id
            )));
        };
        position.stop_loss = new_stop;
        position.take_profit = target;
        Ok(())
    }

    fn close_position(&self, position_id: Uuid) -> EngineResult<()> {
        let position = {
            let mut positions = self.positions.borrow_mut();
            let Some(idx) = positions.iter().position(|p| p.id == position_id) else {
                return Err(EngineError::ExecutionRejected(format!(
                    "unknown position {}",
                    position_id
                )));
            };
            positions.remove(idx)
        };
        let quote = self.last_quotes.borrow().get(&position.symbol).copied();
        let (price, time) = match (&quote, position.side) {
            (Some(q), Side::Long) => (q.bid, q.time),
            (Some(q), Side::Short) => (q.ask, q.time),
            (None, _) => (position.open_price, position.open_time),
        };
        self.record_close(&position, price, "close", time);
        Ok(())
    }

    fn open_positions(&self) -> EngineResult<Vec<Position>> {
        Ok(self.positions.borrow().clone())
    }
}

/// Scripted economic calendar
#[derive(Default)]
pub struct SimCalendar {
    events: RefCell<Vec<CalendarEvent>>,
    /// When set, every lookup fails
    pub fail: Cell<bool>,
}

impl SimCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&self, event: CalendarEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl CalendarService for SimCalendar {
    fn events(
        &self,
        currency: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<CalendarEvent>> {
        if self.fail.get() {
            return Err(EngineError::DataUnavailable(
                "scripted calendar failure".to_string(),
            ));
        }
        Ok(self
            .events
            .borrow()
            .iter()
            .filter(|e| e.currency == currency && e.time >= from && e.time <= to)
            .cloned()
            .collect())
    }
}

/// Blanket impls so shared `Rc` handles can be handed to the orchestrator
/// while the test or replay driver keeps its own
impl<T: MarketDataProvider> MarketDataProvider for Rc<T> {
    fn bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Bar>> {
        (**self).bars(symbol, timeframe, from, to)
    }

    fn quote(&self, symbol: &str) -> EngineResult<Quote> {
        (**self).quote(symbol)
    }
}

impl<T: AccountInfoProvider> AccountInfoProvider for Rc<T> {
    fn equity(&self) -> EngineResult<f64> {
        (**self).equity()
    }
}

impl<T: InstrumentSpecProvider> InstrumentSpecProvider for Rc<T> {
    fn spec(&self, symbol: &str) -> EngineResult<InstrumentSpec> {
        (**self).spec(symbol)
    }
}

impl<T: ExecutionService> ExecutionService for Rc<T> {
    fn open_position(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        entry: f64,
        stop: f64,
        target: f64,
    ) -> EngineResult<Uuid> {
        (**self).open_position(symbol, side, size, entry, stop, target)
    }

    fn modify_stop(&self, position_id: Uuid, new_stop: f64, target: f64) -> EngineResult<()> {
        (**self).modify_stop(position_id, new_stop, target)
    }

    fn close_position(&self, position_id: Uuid) -> EngineResult<()> {
        (**self).close_position(position_id)
    }

    fn open_positions(&self) -> EngineResult<Vec<Position>> {
        (**self).open_positions()
    }
}

impl<T: CalendarService> CalendarService for Rc<T> {
    fn events(
        &self,
        currency: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<CalendarEvent>> {
        (**self).events(currency, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote_at(bid: f64, ask: f64) -> Quote {
        Quote {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            bid,
            ask,
        }
    }

    #[test]
    fn test_stop_fill_closes_long() {
        let execution = SimExecution::new();
        execution.apply_quote("EURUSD", &quote_at(1.1000, 1.1001));
        let id = execution
            .open_position("EURUSD", Side::Long, 1.0, 1.1001, 1.0990, 1.1050)
            .unwrap();

        // Quote above the stop leaves the position open
        execution.apply_quote("EURUSD", &quote_at(1.0995, 1.0996));
        assert!(execution.open_position_for("EURUSD").is_some());

        // Bid through the stop fills it
        execution.apply_quote("EURUSD", &quote_at(1.0989, 1.0990));
        assert!(execution.open_position_for("EURUSD").is_none());

        let trades = execution.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].reason, "stop");
        assert!((trades[0].pnl - (1.0990 - 1.1001)).abs() < 1e-9);

        // The id is gone from the venue
        assert!(execution.close_position(id).is_err());
    }

    #[test]
    fn test_target_fill_closes_short() {
        let execution = SimExecution::new();
        execution.apply_quote("EURUSD", &quote_at(1.1000, 1.1001));
        execution
            .open_position("EURUSD", Side::Short, 1.0, 1.1000, 1.1010, 1.0950)
            .unwrap();

        execution.apply_quote("EURUSD", &quote_at(1.0949, 1.0950));
        let trades = execution.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].reason, "target");
    }

    #[test]
    fn test_modify_rejected_for_unknown_position() {
        let execution = SimExecution::new();
        assert!(execution.modify_stop(Uuid::new_v4(), 1.1, 1.2).is_err());
    }

    #[test]
    fn test_scripted_order_rejection() {
        let execution = SimExecution::new();
        execution.reject_orders.set(true);
        assert!(execution
            .open_position("EURUSD", Side::Long, 1.0, 1.1, 1.09, 1.12)
            .is_err());
    }
}
