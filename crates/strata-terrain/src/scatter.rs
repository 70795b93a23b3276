//! Scattered feature points: blue-noise-style point distributions per chunk.
//!
//! A [`PointScatterer`] produces deterministic jittered points per grid cell.
//! The [`PointGatherer`] wraps it and keeps only the points whose contribution
//! circle can reach any block of a 16×16 chunk footprint, so feature stages
//! never iterate points that cannot affect them.

use glam::DVec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::seed::mix_seed;
use strata_voxel::CHUNK_SIZE;

/// One scattered feature point with its contribution radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatterPoint {
    /// World-space position over the horizontal plane.
    pub position: DVec2,
    /// Radius within which this point can affect blocks.
    pub radius: f64,
}

/// Deterministic per-cell point source.
///
/// The plane is tiled into square cells of `cell_size` blocks; each cell gets
/// an expected `frequency` points (the fractional part is resolved by a
/// deterministic coin flip), jittered uniformly inside the cell.
pub struct PointScatterer {
    seed: u64,
    cell_size: f64,
    frequency: f64,
    radius_range: (f64, f64),
}

impl PointScatterer {
    /// Creates a scatterer.
    ///
    /// # Arguments
    /// - `seed`: world seed (salted internally per cell).
    /// - `cell_size`: side length of one scatter cell in blocks.
    /// - `frequency`: expected points per cell, may be fractional.
    /// - `radius_range`: inclusive range the per-point radius is drawn from.
    ///   A reversed pair is normalized, so `(6.0, 2.0)` behaves like
    ///   `(2.0, 6.0)`; gathering relies on `.1` being the true maximum.
    pub fn new(seed: u64, cell_size: f64, frequency: f64, radius_range: (f64, f64)) -> Self {
        let radius_range = if radius_range.0 <= radius_range.1 {
            radius_range
        } else {
            (radius_range.1, radius_range.0)
        };
        Self {
            seed,
            cell_size,
            frequency,
            radius_range,
        }
    }

    /// Side length of one scatter cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Produces all points of cell `(cell_x, cell_z)`.
    pub fn points_in_cell(&self, cell_x: i64, cell_z: i64) -> Vec<ScatterPoint> {
        let mut rng = ChaCha8Rng::seed_from_u64(mix_seed(self.seed, cell_x, cell_z));
        let mut count = self.frequency.floor() as usize;
        if rng.random::<f64>() < self.frequency.fract() {
            count += 1;
        }
        let base_x = cell_x as f64 * self.cell_size;
        let base_z = cell_z as f64 * self.cell_size;
        (0..count)
            .map(|_| {
                let x = base_x + rng.random::<f64>() * self.cell_size;
                let z = base_z + rng.random::<f64>() * self.cell_size;
                let radius = if self.radius_range.0 < self.radius_range.1 {
                    rng.random_range(self.radius_range.0..=self.radius_range.1)
                } else {
                    self.radius_range.0
                };
                ScatterPoint {
                    position: DVec2::new(x, z),
                    radius,
                }
            })
            .collect()
    }
}

/// Decides whether a point's contribution circle can touch the 16×16 chunk
/// whose center is `(center_x, center_z)`.
///
/// The clearance past the chunk half-width is computed per axis; a point is
/// out when either clearance exceeds the radius, or when both clearances are
/// positive (a corner case, literally) and the corner distance exceeds the
/// radius.
pub fn touches_chunk(point: &ScatterPoint, center_x: f64, center_z: f64) -> bool {
    let half = CHUNK_SIZE as f64 / 2.0;
    let dx = (point.position.x - center_x).abs() - half;
    let dz = (point.position.y - center_z).abs() - half;
    if dx > point.radius || dz > point.radius {
        return false;
    }
    if dx > 0.0 && dz > 0.0 && dx * dx + dz * dz > point.radius * point.radius {
        return false;
    }
    true
}

/// Gathers scattered points relevant to single chunks.
pub struct PointGatherer {
    scatterer: PointScatterer,
}

impl PointGatherer {
    /// Wraps a scatterer.
    pub fn new(scatterer: PointScatterer) -> Self {
        Self { scatterer }
    }

    /// Returns every scatter point whose contribution circle intersects the
    /// chunk starting at block `(chunk_x * 16, chunk_z * 16)`.
    ///
    /// Candidate cells are all cells overlapping the chunk footprint inflated
    /// by the maximum radius; filtering uses swap-removal, so output order is
    /// unspecified (but deterministic for fixed inputs).
    pub fn points_from_chunk_base(&self, chunk_x: i32, chunk_z: i32) -> Vec<ScatterPoint> {
        let base_x = f64::from(chunk_x) * CHUNK_SIZE as f64;
        let base_z = f64::from(chunk_z) * CHUNK_SIZE as f64;
        let half = CHUNK_SIZE as f64 / 2.0;
        let center_x = base_x + half;
        let center_z = base_z + half;

        let reach = half + self.scatterer.radius_range.1;
        let cell = self.scatterer.cell_size;
        let min_cx = ((center_x - reach) / cell).floor() as i64;
        let max_cx = ((center_x + reach) / cell).floor() as i64;
        let min_cz = ((center_z - reach) / cell).floor() as i64;
        let max_cz = ((center_z + reach) / cell).floor() as i64;

        let mut points = Vec::new();
        for cx in min_cx..=max_cx {
            for cz in min_cz..=max_cz {
                points.extend(self.scatterer.points_in_cell(cx, cz));
            }
        }

        let mut i = 0;
        while i < points.len() {
            if touches_chunk(&points[i], center_x, center_z) {
                i += 1;
            } else {
                points.swap_remove(i);
            }
        }
        points
    }
}
