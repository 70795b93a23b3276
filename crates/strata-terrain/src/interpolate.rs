//! Height interpolation: smooths coarse-grid terrain evaluation.
//!
//! Terrain providers are often evaluated on a grid far coarser than block
//! resolution. [`final_height`] hides the resulting quantization steps with a
//! two-level sampling strategy: nine probes on a circle around the query
//! point, each probe itself a bilinear blend of the four grid corners
//! surrounding it. This is a smoothing *approximation*, not an exact
//! interpolation of the provider.

use crate::seed::{det_cos, det_sin};

/// Number of probes on the smoothing circle (one per 40 degrees).
const CIRCLE_SAMPLES: u32 = 9;

/// Bilinearly blends the provider's values at the four `scale`-aligned grid
/// corners surrounding `(x, z)`.
fn bilinear(x: f64, z: f64, scale: f64, provider: &dyn Fn(f64, f64) -> f64) -> f64 {
    let x0 = (x / scale).floor() * scale;
    let z0 = (z / scale).floor() * scale;
    let x1 = x0 + scale;
    let z1 = z0 + scale;
    let tx = (x - x0) / scale;
    let tz = (z - z0) / scale;

    let h00 = provider(x0, z0);
    let h10 = provider(x1, z0);
    let h01 = provider(x0, z1);
    let h11 = provider(x1, z1);

    let low = h00 + (h10 - h00) * tx;
    let high = h01 + (h11 - h01) * tx;
    low + (high - low) * tz
}

/// Returns the smoothed height at `(x, z)`.
///
/// Averages nine bilinear probes placed on a circle of radius `scale` around
/// the query point, stepping 40 degrees between probes, then truncates toward
/// zero. `provider` is evaluated only at `scale`-aligned grid corners.
pub fn final_height(x: f64, z: f64, scale: f64, provider: &dyn Fn(f64, f64) -> f64) -> i32 {
    let mut sum = 0.0;
    for i in 0..CIRCLE_SAMPLES {
        let angle = f64::from(i * 40).to_radians();
        let px = x + det_cos(angle) * scale;
        let pz = z + det_sin(angle) * scale;
        sum += bilinear(px, pz, scale, provider);
    }
    (sum / f64::from(CIRCLE_SAMPLES)) as i32
}
