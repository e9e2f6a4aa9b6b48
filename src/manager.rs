//! Open-position management
//!
//! Staged trailing-stop ladder plus the optional VWAP crossover exit,
//! run on every cycle over all live positions. Stop updates only ever
//! tighten: a candidate that would loosen the stop, sit inside the
//! venue's minimum stop distance or differ from the current stop by
//! less than one increment is discarded.

use tracing::{debug, info, warn};

use crate::ports::ExecutionService;
use crate::signal::STOP_ADR_FRACTION;
use crate::state::InstrumentState;
use crate::types::{round_price, InstrumentSpec, Position, Quote, Side};

/// Profit thresholds in R paired with the R locked at each stage;
/// later stages override earlier ones within one evaluation
const LADDER: [(f64, f64); 4] = [(1.0, 0.0), (2.0, 1.0), (3.0, 2.0), (4.0, 3.0)];

/// Result of managing one position for one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManageOutcome {
    /// Nothing changed
    Held,
    /// Stop tightened to the given price
    StopMoved(f64),
    /// Position fully closed
    Closed,
}

pub struct TradeManager {
    pub crossover_exit_enabled: bool,
}

impl TradeManager {
    /// R locked for the given profit, if any stage is reached
    fn locked_r(profit_r: f64) -> Option<f64> {
        let mut locked = None;
        for (trigger, lock) in LADDER {
            if profit_r >= trigger {
                locked = Some(lock);
            }
        }
        locked
    }

    /// Manage one open position against the latest quote
    pub fn manage(
        &self,
        position: &Position,
        state: &InstrumentState,
        spec: &InstrumentSpec,
        quote: &Quote,
        execution: &dyn ExecutionService,
    ) -> ManageOutcome {
        // Crossover exit fires regardless of ladder state, but only
        // against a live VWAP
        if self.crossover_exit_enabled && state.vwap > 0.0 {
            let crossed = match position.side {
                Side::Long => quote.bid < state.vwap,
                Side::Short => quote.ask > state.vwap,
            };
            if crossed {
                return match execution.close_position(position.id) {
                    Ok(()) => {
                        info!(
                            "CROSSOVER EXIT {} {} @ vwap {:.5} | id {}",
                            position.symbol, position.side, state.vwap, position.id
                        );
                        ManageOutcome::Closed
                    }
                    Err(e) => {
                        warn!("{}: close rejected: {}", position.symbol, e);
                        ManageOutcome::Held
                    }
                };
            }
        }

        let r_increments = STOP_ADR_FRACTION * state.adr;
        if r_increments <= 0.0 || spec.price_increment <= 0.0 {
            return ManageOutcome::Held;
        }

        let current_price = match position.side {
            Side::Long => quote.bid,
            Side::Short => quote.ask,
        };
        let profit_increments = match position.side {
            Side::Long => (current_price - position.open_price) / spec.price_increment,
            Side::Short => (position.open_price - current_price) / spec.price_increment,
        };
        let profit_r = profit_increments / r_increments;

        let Some(locked) = Self::locked_r(profit_r) else {
            return ManageOutcome::Held;
        };

        let offset = locked * r_increments * spec.price_increment;
        let candidate = match position.side {
            Side::Long => round_price(position.open_price + offset, spec.price_precision),
            Side::Short => round_price(position.open_price - offset, spec.price_precision),
        };

        // Monotonic: never loosen an existing stop
        let tightens = match position.side {
            Side::Long => candidate > position.stop_loss,
            Side::Short => candidate < position.stop_loss,
        };
        if !tightens {
            return ManageOutcome::Held;
        }

        // Skip modifies smaller than one increment
        if (candidate - position.stop_loss).abs() < spec.price_increment {
            return ManageOutcome::Held;
        }

        // Respect the venue's minimum stop distance from the market
        let market_distance = match position.side {
            Side::Long => current_price - candidate,
            Side::Short => candidate - current_price,
        };
        if market_distance < spec.min_stop_distance {
            debug!(
                "{}: candidate stop {:.5} inside minimum distance, keeping {:.5}",
                position.symbol, candidate, position.stop_loss
            );
            return ManageOutcome::Held;
        }

        match execution.modify_stop(position.id, candidate, position.take_profit) {
            Ok(()) => {
                info!(
                    "STOP {} {} {:.5} -> {:.5} ({:.0}R locked)",
                    position.symbol, position.side, position.stop_loss, candidate, locked
                );
                ManageOutcome::StopMoved(candidate)
            }
            Err(e) => {
                warn!("{}: stop modify rejected: {}", position.symbol, e);
                ManageOutcome::Held
            }
        }
    }
}
