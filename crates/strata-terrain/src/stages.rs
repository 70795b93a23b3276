//! Built-in chunk stages: surface shaping and scattered feature placement.

use std::cell::RefCell;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use strata_voxel::{BlockTypeId, CHUNK_SIZE, ChunkSnapshot};

use crate::cache::ColumnCache;
use crate::config::GenerationConfig;
use crate::engine::{ChunkStage, StageError};
use crate::interpolate::final_height;
use crate::scatter::PointGatherer;

/// Fills every column up to its interpolated surface height.
///
/// The column height comes from the classified biome's terrain (plus the
/// terrain stack band containing the preliminary height), smoothed by the
/// circular interpolator so neighboring biomes blend instead of stepping. The
/// top block and the band below it come from the biome; everything deeper is
/// the configured filler.
pub struct SurfaceStage {
    filler: BlockTypeId,
    subsurface_depth: i32,
}

impl SurfaceStage {
    /// Creates a surface stage with the given deep filler block.
    pub fn new(filler: BlockTypeId) -> Self {
        Self {
            filler,
            subsurface_depth: 3,
        }
    }

    /// Raw (un-interpolated) surface height at a world coordinate.
    fn column_height(config: &GenerationConfig, x: f64, z: f64) -> Result<f64, StageError> {
        let classification = config.distributor.classify(x, z)?;
        let biome = config.biomes.get(classification.biome);
        let height = biome.terrain.height(x, z, classification.strength);
        Ok(match config.terrain_stack.select(height.floor() as i32) {
            Some(band) => height + band.terrain.height(x, z, classification.strength),
            None => height,
        })
    }
}

impl ChunkStage for SurfaceStage {
    fn name(&self) -> &str {
        "surface"
    }

    fn apply(
        &self,
        snapshot: &mut ChunkSnapshot,
        _rng: &mut ChaCha8Rng,
        config: &GenerationConfig,
    ) -> Result<(), StageError> {
        let dim = &config.dimension;
        let base_x = snapshot.chunk_x() * CHUNK_SIZE as i32;
        let base_z = snapshot.chunk_z() * CHUNK_SIZE as i32;
        let floor = f64::from(dim.min_y);

        // Neighboring columns share most grid corners, and every corner costs
        // a full classification plus terrain evaluation, so corners are
        // memoized across the whole chunk pass.
        let heights = RefCell::new(ColumnCache::new(dim.interpolation_scale));
        // The interpolator's provider cannot propagate errors, so the first
        // failure is parked here and re-raised after the call.
        let failure = RefCell::new(None);
        let provider = |px: f64, pz: f64| {
            heights
                .borrow_mut()
                .get_or_insert_with(px, pz, || match Self::column_height(config, px, pz) {
                    Ok(height) => height,
                    Err(source) => {
                        failure.borrow_mut().get_or_insert(source);
                        floor
                    }
                })
        };

        for lx in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                let wx = f64::from(base_x + lx as i32);
                let wz = f64::from(base_z + lz as i32);

                let surface = final_height(wx, wz, dim.interpolation_scale, &provider);
                if let Some(source) = failure.borrow_mut().take() {
                    return Err(source);
                }
                let surface = surface.clamp(dim.min_y, dim.max_y - 1);

                let section = snapshot.biome_at(lx, surface, lz)?.ok_or_else(|| {
                    StageError::Custom(format!("biome section missing at ({lx}, {lz})"))
                })?;
                let biome = config.biomes.get(section.biome);
                for y in dim.min_y..=surface {
                    let block = if y == surface {
                        biome.surface_block
                    } else if y >= surface - self.subsurface_depth {
                        biome.subsurface_block
                    } else {
                        self.filler
                    };
                    snapshot.set_block(lx, y, lz, block)?;
                }
            }
        }
        Ok(())
    }
}

/// Places a marker block on the surface at gathered scatter points.
///
/// Only points whose center falls inside the chunk place anything; out-of-chunk
/// points are still gathered (their circles overlap) but belong to their home
/// chunk for placement, which keeps placement chunk-independent.
pub struct ScatterFeatureStage {
    gatherer: PointGatherer,
    block: BlockTypeId,
    density: f64,
}

impl ScatterFeatureStage {
    /// Creates a feature stage.
    ///
    /// `density` in `[0.0, 1.0]` is the per-point placement probability drawn
    /// from the chunk RNG.
    pub fn new(gatherer: PointGatherer, block: BlockTypeId, density: f64) -> Self {
        Self {
            gatherer,
            block,
            density,
        }
    }
}

impl ChunkStage for ScatterFeatureStage {
    fn name(&self) -> &str {
        "scatter_features"
    }

    fn apply(
        &self,
        snapshot: &mut ChunkSnapshot,
        rng: &mut ChaCha8Rng,
        config: &GenerationConfig,
    ) -> Result<(), StageError> {
        let dim = &config.dimension;
        let base_x = i64::from(snapshot.chunk_x()) * CHUNK_SIZE as i64;
        let base_z = i64::from(snapshot.chunk_z()) * CHUNK_SIZE as i64;

        for point in self
            .gatherer
            .points_from_chunk_base(snapshot.chunk_x(), snapshot.chunk_z())
        {
            if rng.random::<f64>() >= self.density {
                continue;
            }
            let lx = point.position.x.floor() as i64 - base_x;
            let lz = point.position.y.floor() as i64 - base_z;
            if !(0..CHUNK_SIZE as i64).contains(&lx) || !(0..CHUNK_SIZE as i64).contains(&lz) {
                continue;
            }
            let (lx, lz) = (lx as usize, lz as usize);

            // Surface scan from the top of the band.
            let mut y = dim.max_y - 1;
            while y > dim.min_y && snapshot.block(lx, y, lz)? == BlockTypeId::AIR {
                y -= 1;
            }
            if snapshot.block(lx, y, lz)? == BlockTypeId::AIR {
                continue;
            }
            if y + 1 < dim.max_y {
                snapshot.set_block(lx, y + 1, lz, self.block)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BiomeConfig, DimensionDef, GenerationDef, NoiseDef, RegionDef, TerrainDef,
    };
    use crate::engine::Engine;
    use crate::noise::NoiseAlgorithm;
    use crate::scatter::PointScatterer;
    use std::sync::Arc;
    use strata_voxel::{BiomeLayout, BlockDef, BlockRegistry};

    const MARKER: BlockTypeId = BlockTypeId(3);

    fn blocks() -> BlockRegistry {
        let mut reg = BlockRegistry::new();
        for name in ["strata:stone", "strata:grass", "strata:sapling"] {
            reg.register(BlockDef {
                name: name.into(),
                solid: true,
            })
            .unwrap();
        }
        reg
    }

    fn flat_world_def() -> GenerationDef {
        GenerationDef {
            dimension: DimensionDef {
                name: "testbed".into(),
                min_y: 0,
                max_y: 128,
                biome_layout: BiomeLayout::Flat,
                interpolation_scale: 8.0,
            },
            noise: vec![NoiseDef {
                name: "climate".into(),
                algorithm: NoiseAlgorithm::Simplex,
                salt: 1,
                frequency: 0.005,
            }],
            biomes: vec![BiomeConfig {
                name: "plains".into(),
                base_height: 64.0,
                surface_block: "strata:grass".into(),
                subsurface_block: "strata:stone".into(),
                strength_precision: 100.0,
                // No deviation layers: an exactly flat surface at y = 64.
                terrain: TerrainDef::Layered { layers: Vec::new() },
            }],
            regions: vec![RegionDef {
                name: "root".into(),
                noise: Vec::new(),
                regions: Vec::new(),
                biomes: Vec::new(),
                fallback_region: None,
                fallback_biome: Some("plains".into()),
                default_modifiers: Vec::new(),
                strength_precision: 100.0,
            }],
            root_region: "root".into(),
            terrain_stack: Vec::new(),
        }
    }

    fn feature_engine(seed: u64, density: f64) -> Engine {
        let config = flat_world_def().link(seed, &blocks()).unwrap();
        let gatherer = PointGatherer::new(PointScatterer::new(seed, 12.0, 1.5, (2.0, 6.0)));
        Engine::new(Arc::new(config))
            .with_chunk_stage(Box::new(SurfaceStage::new(BlockTypeId(1))))
            .with_chunk_stage(Box::new(ScatterFeatureStage::new(gatherer, MARKER, density)))
    }

    fn count_markers(engine: &Engine, chunks: i32) -> usize {
        let mut markers = 0;
        for cx in 0..chunks {
            for cz in 0..chunks {
                let mut snap = engine.new_snapshot(cx, cz);
                engine.apply_chunk_stages(&mut snap).unwrap();
                for x in 0..CHUNK_SIZE {
                    for z in 0..CHUNK_SIZE {
                        for y in 0..128 {
                            if snap.block(x, y, z).unwrap() == MARKER {
                                markers += 1;
                                // Markers always sit on a solid block.
                                assert_ne!(snap.block(x, y - 1, z).unwrap(), BlockTypeId::AIR);
                            }
                        }
                    }
                }
            }
        }
        markers
    }

    #[test]
    fn test_flat_terrain_surface_is_exact() {
        let engine = feature_engine(7, 0.0);
        let mut snap = engine.new_snapshot(0, 0);
        engine.apply_chunk_stages(&mut snap).unwrap();
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                // Biome terrain is constant 64, so interpolation is exact.
                assert_eq!(snap.block(x, 64, z).unwrap(), BlockTypeId(2), "({x}, {z})");
                assert_eq!(snap.block(x, 63, z).unwrap(), BlockTypeId(1));
                assert_eq!(snap.block(x, 65, z).unwrap(), BlockTypeId::AIR);
            }
        }
    }

    #[test]
    fn test_features_land_on_surface() {
        let markers = count_markers(&feature_engine(1234, 1.0), 4);
        assert!(markers > 0, "no features placed across 16 chunks");
    }

    #[test]
    fn test_zero_density_places_nothing() {
        assert_eq!(count_markers(&feature_engine(1234, 0.0), 2), 0);
    }

    #[test]
    fn test_feature_placement_deterministic() {
        let a = count_markers(&feature_engine(55, 0.5), 3);
        let b = count_markers(&feature_engine(55, 0.5), 3);
        assert_eq!(a, b);
    }
}
