//! Market analytics computed from bar data
//!
//! - Session-anchored VWAP
//! - Average daily range
//! - Binned volume profile with POC and volume-node bands

pub mod adr;
pub mod profile;
pub mod vwap;

pub use adr::average_daily_range;
pub use profile::{build_profile, derive_bands, PriceBin, ProfileBands, VolumeProfile};
pub use vwap::session_vwap;
