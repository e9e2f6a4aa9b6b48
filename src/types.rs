use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed price bar for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Typical price used by VWAP and volume-profile binning
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Latest bid/ask for one instrument
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub time: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}

/// Bar timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Wall-clock length of one bar
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        write!(f, "{}", name)
    }
}

/// Per-instrument trading constraints from the venue
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Minimum price increment (tick size)
    pub price_increment: f64,
    /// Decimal digits prices are quoted at
    pub price_precision: u32,
    /// Account-currency value of one increment per unit of size
    pub increment_value: f64,
    /// Order size granularity
    pub size_step: f64,
    pub min_size: f64,
    pub max_size: f64,
    /// Smallest allowed gap between a pending stop/target and the market price
    pub min_stop_distance: f64,
}

/// An open position as reported by the execution venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub open_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub open_time: DateTime<Utc>,
}

/// Round a price to the instrument's quoted precision
pub fn round_price(price: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (price * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(1.104444, 4), 1.1044);
        assert_eq!(round_price(1.10446, 4), 1.1045);
        assert_eq!(round_price(21503.7, 0), 21504.0);
    }

    #[test]
    fn test_typical_price() {
        let bar = Bar {
            open_time: Utc::now(),
            open: 1.1030,
            high: 1.1050,
            low: 1.1020,
            close: 1.1040,
            volume: 100,
        };
        assert!((bar.typical_price() - 1.1036666).abs() < 1e-6);
    }

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::M5.duration(), Duration::minutes(5));
        assert_eq!(Timeframe::D1.duration(), Duration::days(1));
    }
}
