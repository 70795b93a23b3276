//! Per-chunk memoization of distributor and terrain results.
//!
//! Classification is by far the most expensive per-coordinate operation, and
//! several consumers (section population, terrain providers, feature stages)
//! ask for the same coordinates within one chunk's lifetime. Two shapes are
//! provided, both scoped to a single chunk's generation: [`BiomeCache`] is a
//! dense array over the chunk's section grid, [`ColumnCache`] a sparse memo
//! over the interpolation grid corners, which can fall outside the chunk.

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use strata_voxel::{BiomeSection, SECTIONS_PER_AXIS};

/// Dense per-chunk biome lookup keyed by section-local coordinates.
pub struct BiomeCache {
    sections_y: usize,
    cells: Vec<Option<BiomeSection>>,
}

impl BiomeCache {
    /// Creates an empty cache for a chunk spanning `[min_y, max_y)`.
    pub fn new(min_y: i32, max_y: i32) -> Self {
        let sections_y = ((max_y - min_y) as usize) / 4;
        Self {
            sections_y,
            cells: vec![None; SECTIONS_PER_AXIS * SECTIONS_PER_AXIS * sections_y],
        }
    }

    /// Number of sections along the vertical axis.
    pub fn sections_y(&self) -> usize {
        self.sections_y
    }

    /// Stores a classification for section `(sx, sy, sz)`.
    ///
    /// Unlike snapshot slots, re-setting a populated cell **overwrites** it:
    /// the cache is a memo, not the authoritative record, so the last writer
    /// wins and no fault is raised.
    pub fn set_biome(&mut self, sx: usize, sy: usize, sz: usize, section: BiomeSection) {
        let idx = self.index(sx, sy, sz);
        self.cells[idx] = Some(section);
    }

    /// Returns the cached classification for section `(sx, sy, sz)`, if any.
    pub fn get_point(&self, sx: usize, sy: usize, sz: usize) -> Option<BiomeSection> {
        self.cells[self.index(sx, sy, sz)]
    }

    /// Returns the cached classification, computing and storing it on miss.
    pub fn get_or_insert_with<E>(
        &mut self,
        sx: usize,
        sy: usize,
        sz: usize,
        classify: impl FnOnce() -> Result<BiomeSection, E>,
    ) -> Result<BiomeSection, E> {
        if let Some(section) = self.get_point(sx, sy, sz) {
            return Ok(section);
        }
        let section = classify()?;
        self.set_biome(sx, sy, sz, section);
        Ok(section)
    }

    fn index(&self, sx: usize, sy: usize, sz: usize) -> usize {
        assert!(
            sx < SECTIONS_PER_AXIS && sz < SECTIONS_PER_AXIS && sy < self.sections_y,
            "section ({sx}, {sy}, {sz}) outside cache grid 4x{}x4",
            self.sections_y
        );
        sx + sz * SECTIONS_PER_AXIS + sy * SECTIONS_PER_AXIS * SECTIONS_PER_AXIS
    }
}

/// Sparse memo of column heights at `scale`-aligned grid corners.
///
/// The height interpolator only queries its provider at grid corners, and
/// neighboring columns share most of them, so one chunk pass evaluates each
/// corner exactly once through this memo instead of once per probe. Keys are
/// grid indices rather than section coordinates because corners near the
/// chunk border fall outside the chunk footprint.
pub struct ColumnCache {
    scale: f64,
    heights: HashMap<(i64, i64), f64>,
}

impl ColumnCache {
    /// Creates an empty memo for corners aligned to `scale`.
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            heights: HashMap::new(),
        }
    }

    /// Returns the height of the corner at `(x, z)`, computing and storing it
    /// on miss. `(x, z)` must be `scale`-aligned; it is snapped to the
    /// nearest grid index for keying.
    pub fn get_or_insert_with(&mut self, x: f64, z: f64, compute: impl FnOnce() -> f64) -> f64 {
        let key = (
            (x / self.scale).round() as i64,
            (z / self.scale).round() as i64,
        );
        match self.heights.entry(key) {
            Entry::Occupied(slot) => *slot.get(),
            Entry::Vacant(slot) => *slot.insert(compute()),
        }
    }
}
