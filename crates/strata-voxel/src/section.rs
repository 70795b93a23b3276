//! Coarse biome sections: biome data is stored at 4-block granularity because
//! classification is far more expensive than block placement and biome
//! boundaries do not need block resolution.

use serde::{Deserialize, Serialize};

/// Side length of a biome section in blocks.
pub const SECTION_SIZE: usize = 4;

/// Number of biome sections along one horizontal chunk axis (16 / 4).
pub const SECTIONS_PER_AXIS: usize = crate::chunk::CHUNK_SIZE / SECTION_SIZE;

/// Unique identifier for a biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BiomeId(pub u16);

/// How a dimension stores biome data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiomeLayout {
    /// One biome per 4×4 column: a flat 2D map over the chunk footprint.
    #[default]
    Flat,
    /// Full 3D biomes: one per 4×4×4 cell.
    Volumetric,
}

/// An immutable handle to a resolved biome for one section cell.
///
/// Carries the classification strength alongside the biome so consumers can
/// blend across borders without re-running the distributor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomeSection {
    /// The resolved biome.
    pub biome: BiomeId,
    /// Blend strength in `[0.0, 1.0]` as produced by the distributor.
    pub strength: f32,
}

impl BiomeSection {
    /// Creates a section handle.
    pub fn new(biome: BiomeId, strength: f32) -> Self {
        Self { biome, strength }
    }
}
