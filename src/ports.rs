//! Port definitions (traits) for the engine's external collaborators
//!
//! These define the boundary between the decision core and the outside
//! world: market data, account state, instrument specifications, order
//! execution and the economic calendar. Live adapters and the in-memory
//! simulators in [`crate::sim`] implement the same traits. All calls are
//! synchronous and bounded; a slow or failing collaborator degrades that
//! cycle's outcome without blocking subsequent cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::types::{Bar, InstrumentSpec, Position, Quote, Side, Timeframe};

/// Price history and live quotes
pub trait MarketDataProvider {
    /// Ordered bars with open times in `[from, to]`; may be empty when the
    /// feed has nothing for the window
    fn bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Bar>>;

    /// Latest bid/ask
    fn quote(&self, symbol: &str) -> EngineResult<Quote>;
}

/// Account equity lookup
pub trait AccountInfoProvider {
    fn equity(&self) -> EngineResult<f64>;
}

/// Per-instrument trading constraints
pub trait InstrumentSpecProvider {
    fn spec(&self, symbol: &str) -> EngineResult<InstrumentSpec>;
}

/// Order placement and position maintenance
pub trait ExecutionService {
    /// Place a market order with an attached stop and target; returns the
    /// venue's position id on fill
    fn open_position(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        entry: f64,
        stop: f64,
        target: f64,
    ) -> EngineResult<Uuid>;

    fn modify_stop(&self, position_id: Uuid, new_stop: f64, target: f64) -> EngineResult<()>;

    fn close_position(&self, position_id: Uuid) -> EngineResult<()>;

    /// All currently open positions at the venue
    fn open_positions(&self) -> EngineResult<Vec<Position>>;
}

/// Scheduled-event impact level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventImportance {
    Low,
    Moderate,
    High,
}

/// One scheduled economic event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub currency: String,
    pub time: DateTime<Utc>,
    pub importance: EventImportance,
}

/// Scheduled economic events by currency
pub trait CalendarService {
    fn events(
        &self,
        currency: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<CalendarEvent>>;
}
