//! Biome definition: the fully linked descriptor of a single biome.

use std::sync::Arc;

use strata_voxel::BlockTypeId;

use crate::terrain::Terrain;

/// Full descriptor for a biome, with every name reference already resolved.
#[derive(Clone)]
pub struct BiomeDef {
    /// Configuration name (e.g. "highland_tundra").
    pub name: String,
    /// Surface height this biome's terrain deviates from, in world Y.
    pub base_height: f64,
    /// Block placed at the terrain surface.
    pub surface_block: BlockTypeId,
    /// Block placed in the layers immediately below the surface.
    pub subsurface_block: BlockTypeId,
    /// Strength rounding precision: final strength is
    /// `round(strength * precision) / precision`.
    pub strength_precision: f64,
    /// The terrain implementation shaping this biome's surface.
    pub terrain: Arc<dyn Terrain>,
}

impl std::fmt::Debug for BiomeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiomeDef")
            .field("name", &self.name)
            .field("base_height", &self.base_height)
            .field("surface_block", &self.surface_block)
            .field("subsurface_block", &self.subsurface_block)
            .field("strength_precision", &self.strength_precision)
            .finish_non_exhaustive()
    }
}
