//! PE-grid utilisation
//!
//! Compares the measured cycle count of a run against the ideal in which all
//! 64 PEs retire one multiply-accumulate every cycle.

use darius_chip::grid::GridTopology;

use crate::config::ConvConfig;
use crate::error::{DariusError, Result};
use crate::geometry::DerivedGeometry;

/// Multiply-accumulates the convolution performs
///
/// `ofm_height × ofm_width × ofm_depth × kh × kw × ifm_depth`
pub fn mac_count(conv: &ConvConfig, geom: &DerivedGeometry) -> u64 {
    geom.ofm_height
        .saturating_mul(geom.ofm_width)
        .saturating_mul(geom.ofm_depth)
        .saturating_mul(geom.kernel_area)
        .saturating_mul(u64::from(conv.ifm_depth))
}

/// Grid utilisation in percent for a run that took `hw_cycles`
///
/// # Errors
///
/// Returns [`DariusError::ZeroCycles`] if `hw_cycles` is 0.
#[allow(clippy::cast_precision_loss)]
pub fn efficiency(conv: &ConvConfig, geom: &DerivedGeometry, hw_cycles: u64) -> Result<f64> {
    if hw_cycles == 0 {
        return Err(DariusError::ZeroCycles);
    }
    let theoretical_cycles =
        mac_count(conv, geom) as f64 / GridTopology::DARIUS.macs_per_cycle() as f64;
    Ok(theoretical_cycles / hw_cycles as f64 * 100.0)
}
