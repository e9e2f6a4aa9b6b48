//! Binned volume profile
//!
//! Partitions a session's price range into fixed-width bins, accumulates
//! bar volume per bin and derives the point of control plus the high- and
//! low-volume-node bands.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{round_price, Bar};

/// One fixed-width price bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBin {
    pub lower_price: f64,
    pub volume: u64,
}

/// Volume-at-price histogram over one session window
///
/// Rebuilt wholesale on each update; the previous instance is discarded,
/// never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub bins: Vec<PriceBin>,
    pub bin_width: f64,
    pub session_low: f64,
    pub session_high: f64,
    pub total_volume: u64,
}

/// Published band prices derived from a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfileBands {
    pub poc_price: f64,
    pub hvn_lower: f64,
    pub hvn_upper: f64,
    pub lvn_lower: f64,
    pub lvn_upper: f64,
}

/// Build the volume profile for a session's bars
///
/// Each bar's typical price selects a bin and the bar's whole volume
/// accumulates there. Errors on an empty window, a zero-width session
/// range or zero total volume; the caller retains its previous bands.
pub fn build_profile(bars: &[Bar], bin_count: usize) -> EngineResult<VolumeProfile> {
    if bars.is_empty() {
        return Err(EngineError::DataUnavailable(
            "no bars in session window".to_string(),
        ));
    }
    if bin_count == 0 {
        return Err(EngineError::ConstraintViolation(
            "profile bin count is zero".to_string(),
        ));
    }

    let session_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let session_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);

    if session_high <= session_low {
        return Err(EngineError::DegenerateRange(format!(
            "session range [{:.5}, {:.5}] has zero width",
            session_low, session_high
        )));
    }

    let bin_width = (session_high - session_low) / bin_count as f64;
    let mut bins: Vec<PriceBin> = (0..bin_count)
        .map(|i| PriceBin {
            lower_price: session_low + i as f64 * bin_width,
            volume: 0,
        })
        .collect();

    let mut total_volume = 0u64;
    for bar in bars {
        let idx = ((bar.typical_price() - session_low) / bin_width).floor() as i64;
        let idx = idx.clamp(0, bin_count as i64 - 1) as usize;
        bins[idx].volume += bar.volume;
        total_volume += bar.volume;
    }

    if total_volume == 0 {
        return Err(EngineError::DegenerateRange(
            "zero session volume".to_string(),
        ));
    }

    Ok(VolumeProfile {
        bins,
        bin_width,
        session_low,
        session_high,
        total_volume,
    })
}

impl VolumeProfile {
    /// Index of the point-of-control bin (first bin on volume ties)
    pub fn poc_index(&self) -> usize {
        let mut best = 0;
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.volume > self.bins[best].volume {
                best = i;
            }
        }
        best
    }
}

/// Derive POC and volume-node bands from a profile
///
/// A bin is a high-volume node when its volume strictly exceeds the mean
/// volume per bin, and a low-volume node when it sits at or below it.
/// The HVN band seeds at the POC price when no bin qualifies; the LVN
/// band seeds at the full session range. All published prices are
/// rounded to the instrument's precision.
pub fn derive_bands(profile: &VolumeProfile, precision: u32) -> ProfileBands {
    let threshold = profile.total_volume as f64 / profile.bins.len() as f64;
    let poc_price = profile.bins[profile.poc_index()].lower_price;

    let mut hvn: Option<(f64, f64)> = None;
    let mut lvn: Option<(f64, f64)> = None;

    for bin in &profile.bins {
        if bin.volume as f64 > threshold {
            hvn = Some(match hvn {
                Some((lo, hi)) => (lo.min(bin.lower_price), hi.max(bin.lower_price)),
                None => (bin.lower_price, bin.lower_price),
            });
        } else {
            lvn = Some(match lvn {
                Some((lo, hi)) => (lo.min(bin.lower_price), hi.max(bin.lower_price)),
                None => (bin.lower_price, bin.lower_price),
            });
        }
    }

    let (hvn_lower, hvn_upper) = hvn.unwrap_or((poc_price, poc_price));
    let (lvn_lower, lvn_upper) = lvn.unwrap_or((profile.session_low, profile.session_high));

    ProfileBands {
        poc_price: round_price(poc_price, precision),
        hvn_lower: round_price(hvn_lower, precision),
        hvn_upper: round_price(hvn_upper, precision),
        lvn_lower: round_price(lvn_lower, precision),
        lvn_upper: round_price(lvn_upper, precision),
    }
}
