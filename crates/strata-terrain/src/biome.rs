//! Biome definitions and the registry resolving [`BiomeId`] handles.

mod def;
mod registry;

pub use def::BiomeDef;
pub use registry::{BiomeRegistry, BiomeRegistryError};

pub use strata_voxel::BiomeId;
