//! The generation engine: drives one chunk through biome population, the
//! ordered chunk-local stages, and the snapshot lifecycle, then runs
//! cross-chunk world stages under the world lock discipline.
//!
//! Stage authors implement [`ChunkStage`] (bounded to one chunk snapshot) or
//! [`WorldStage`] (free to touch neighbors through a [`WorldSnapshot`]). Both
//! receive a deterministic per-chunk RNG; a chunk generated twice from the
//! same seed and configuration is byte-identical.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use tracing::debug;

use strata_voxel::{
    BiomeLayout, BiomeSection, CHUNK_SIZE, ChunkSnapshot, SECTION_SIZE, SECTIONS_PER_AXIS,
    SnapshotError, WorldSnapshot,
};

use crate::cache::BiomeCache;
use crate::config::GenerationConfig;
use crate::distributor::{Classification, ClassifyError};
use crate::seed::chunk_rng;

/// Keeps world-stage RNG streams disjoint from chunk-stage streams for the
/// same chunk coordinates.
const WORLD_STAGE_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Errors a stage can raise. All of them abort the chunk being generated.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    /// Stage-specific failure.
    #[error("{0}")]
    Custom(String),
}

/// Errors surfaced by the engine, annotated with the failing chunk and stage.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("chunk ({chunk_x}, {chunk_z}): biome population failed: {source}")]
    Populate {
        chunk_x: i32,
        chunk_z: i32,
        source: StageError,
    },
    #[error("chunk ({chunk_x}, {chunk_z}): stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        chunk_x: i32,
        chunk_z: i32,
        source: StageError,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A generation pass bounded to a single chunk.
pub trait ChunkStage: Send + Sync {
    /// Stage name, used in diagnostics and error context.
    fn name(&self) -> &str;

    /// Applies the stage to one chunk snapshot.
    ///
    /// Biome sections are guaranteed populated before any stage runs. `rng`
    /// is deterministic per `(seed, chunk)` and shared by all chunk stages in
    /// declaration order, so stage order is part of the reproducibility
    /// contract.
    fn apply(
        &self,
        snapshot: &mut ChunkSnapshot,
        rng: &mut ChaCha8Rng,
        config: &GenerationConfig,
    ) -> Result<(), StageError>;
}

/// A generation pass that may touch chunks beyond the one being generated.
///
/// Implementations receive the [`WorldSnapshot`] and must acquire the lock of
/// every chunk they mutate through it.
pub trait WorldStage: Send + Sync {
    /// Stage name, used in diagnostics and error context.
    fn name(&self) -> &str;

    /// Applies the stage for the chunk at `(chunk_x, chunk_z)`.
    fn apply(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        world: &WorldSnapshot,
        rng: &mut ChaCha8Rng,
        config: &GenerationConfig,
    ) -> Result<(), StageError>;
}

/// Orchestrates chunk generation against one linked configuration.
pub struct Engine {
    config: Arc<GenerationConfig>,
    chunk_stages: Vec<Box<dyn ChunkStage>>,
    world_stages: Vec<Box<dyn WorldStage>>,
}

impl Engine {
    /// Creates an engine with no stages registered.
    pub fn new(config: Arc<GenerationConfig>) -> Self {
        Self {
            config,
            chunk_stages: Vec::new(),
            world_stages: Vec::new(),
        }
    }

    /// Appends a chunk stage. Stages run in registration order.
    pub fn with_chunk_stage(mut self, stage: Box<dyn ChunkStage>) -> Self {
        self.chunk_stages.push(stage);
        self
    }

    /// Appends a world stage. Stages run in registration order.
    pub fn with_world_stage(mut self, stage: Box<dyn WorldStage>) -> Self {
        self.world_stages.push(stage);
        self
    }

    /// The configuration this engine generates against.
    pub fn config(&self) -> &Arc<GenerationConfig> {
        &self.config
    }

    /// Creates an empty snapshot matching the configured dimension.
    pub fn new_snapshot(&self, chunk_x: i32, chunk_z: i32) -> ChunkSnapshot {
        let dim = &self.config.dimension;
        ChunkSnapshot::new(chunk_x, chunk_z, dim.min_y, dim.max_y, dim.biome_layout)
    }

    /// Runs the full chunk-local pipeline on a fresh snapshot: biome
    /// population, every registered chunk stage in order, then the lifecycle
    /// transitions through to `Finished`.
    pub fn apply_chunk_stages(&self, snapshot: &mut ChunkSnapshot) -> Result<(), EngineError> {
        let (chunk_x, chunk_z) = (snapshot.chunk_x(), snapshot.chunk_z());
        let mut rng = chunk_rng(self.config.world_seed, chunk_x, chunk_z);

        self.populate_biomes(snapshot)
            .map_err(|source| EngineError::Populate {
                chunk_x,
                chunk_z,
                source,
            })?;
        snapshot.mark_biomes_populated()?;

        for stage in &self.chunk_stages {
            debug!(stage = stage.name(), chunk_x, chunk_z, "applying chunk stage");
            stage
                .apply(snapshot, &mut rng, &self.config)
                .map_err(|source| EngineError::Stage {
                    stage: stage.name().to_owned(),
                    chunk_x,
                    chunk_z,
                    source,
                })?;
        }
        snapshot.mark_stages_applied()?;
        snapshot.finish()?;
        Ok(())
    }

    /// Runs every registered world stage for `(chunk_x, chunk_z)`.
    ///
    /// The caller decides when neighbor chunks are ready; stages themselves
    /// take the per-chunk locks they need from `world`.
    pub fn apply_world_stages(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        world: &WorldSnapshot,
    ) -> Result<(), EngineError> {
        let mut rng = chunk_rng(self.config.world_seed ^ WORLD_STAGE_SALT, chunk_x, chunk_z);
        for stage in &self.world_stages {
            debug!(stage = stage.name(), chunk_x, chunk_z, "applying world stage");
            stage
                .apply(chunk_x, chunk_z, world, &mut rng, &self.config)
                .map_err(|source| EngineError::Stage {
                    stage: stage.name().to_owned(),
                    chunk_x,
                    chunk_z,
                    source,
                })?;
        }
        Ok(())
    }

    /// Classifies and writes every biome section the snapshot's layout needs.
    ///
    /// Sections are classified at their minimum world corner. Column sections
    /// always use the 2D classifier; volumetric cells additionally classify
    /// in 3D per vertical section.
    fn populate_biomes(&self, snapshot: &mut ChunkSnapshot) -> Result<(), StageError> {
        let distributor = &self.config.distributor;
        let base_x = snapshot.chunk_x() * CHUNK_SIZE as i32;
        let base_z = snapshot.chunk_z() * CHUNK_SIZE as i32;
        let min_y = snapshot.min_y();
        let mut cache = BiomeCache::new(min_y, snapshot.max_y());

        for sx in 0..SECTIONS_PER_AXIS {
            for sz in 0..SECTIONS_PER_AXIS {
                let wx = f64::from(base_x + (sx * SECTION_SIZE) as i32);
                let wz = f64::from(base_z + (sz * SECTION_SIZE) as i32);
                match snapshot.layout() {
                    BiomeLayout::Flat => {
                        let section = cache.get_or_insert_with(sx, 0, sz, || {
                            distributor.classify(wx, wz).map(section_from)
                        })?;
                        snapshot.set_column_section(sx, sz, section)?;
                    }
                    BiomeLayout::Volumetric => {
                        let column = section_from(distributor.classify(wx, wz)?);
                        snapshot.set_column_section(sx, sz, column)?;
                        for sy in 0..snapshot.sections_y() {
                            let wy = f64::from(min_y + (sy * SECTION_SIZE) as i32);
                            let cell = cache.get_or_insert_with(sx, sy, sz, || {
                                distributor.classify_3d(wx, wy, wz).map(section_from)
                            })?;
                            snapshot.set_cell_section(sx, sy, sz, cell)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn section_from(classification: Classification) -> BiomeSection {
    BiomeSection::new(classification.biome, classification.strength as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BiomeConfig, DimensionDef, GenerationDef, NoiseDef, RegionDef, RequirementDef, RuleDef,
        TerrainDef, TerrainLayerDef,
    };
    use crate::noise::NoiseAlgorithm;
    use crate::stages::SurfaceStage;
    use strata_voxel::{BlockDef, BlockRegistry, BlockTypeId, SnapshotState};

    fn blocks() -> BlockRegistry {
        let mut reg = BlockRegistry::new();
        for name in ["strata:stone", "strata:grass", "strata:dirt", "strata:sand"] {
            reg.register(BlockDef {
                name: name.into(),
                solid: true,
            })
            .unwrap();
        }
        reg
    }

    fn two_biome_def(layout: BiomeLayout) -> GenerationDef {
        let biome = |name: &str, surface: &str, salt| BiomeConfig {
            name: name.into(),
            base_height: 64.0,
            surface_block: surface.into(),
            subsurface_block: "strata:dirt".into(),
            strength_precision: 100.0,
            terrain: TerrainDef::Layered {
                layers: vec![TerrainLayerDef {
                    noise: NoiseDef {
                        name: "hills".into(),
                        algorithm: NoiseAlgorithm::Simplex,
                        salt,
                        frequency: 1.0,
                    },
                    zoom: 48.0,
                    coefficient: 12.0,
                }],
            },
        };
        GenerationDef {
            dimension: DimensionDef {
                name: "overworld".into(),
                min_y: -64,
                max_y: 320,
                biome_layout: layout,
                interpolation_scale: 8.0,
            },
            noise: vec![NoiseDef {
                name: "climate".into(),
                algorithm: NoiseAlgorithm::Simplex,
                salt: 1,
                frequency: 0.005,
            }],
            biomes: vec![
                biome("plains", "strata:grass", 40),
                biome("desert", "strata:sand", 41),
            ],
            regions: vec![RegionDef {
                name: "root".into(),
                noise: Vec::new(),
                regions: Vec::new(),
                biomes: vec![RuleDef {
                    target: "desert".into(),
                    requirements: vec![RequirementDef::NoiseRange {
                        noise: "climate".into(),
                        ranges: vec![(0.1, 2.0)],
                    }],
                    use_default_modifiers: true,
                    modifiers: Vec::new(),
                }],
                fallback_region: None,
                fallback_biome: Some("plains".into()),
                default_modifiers: Vec::new(),
                strength_precision: 100.0,
            }],
            root_region: "root".into(),
            terrain_stack: Vec::new(),
        }
    }

    fn engine(seed: u64, layout: BiomeLayout) -> Engine {
        let config = two_biome_def(layout).link(seed, &blocks()).unwrap();
        Engine::new(Arc::new(config)).with_chunk_stage(Box::new(SurfaceStage::new(
            BlockTypeId(1),
        )))
    }

    #[test]
    fn test_chunk_pipeline_reaches_finished() {
        let engine = engine(1234, BiomeLayout::Flat);
        let mut snap = engine.new_snapshot(0, 0);
        engine.apply_chunk_stages(&mut snap).unwrap();
        assert_eq!(snap.state(), SnapshotState::Finished);
        assert!(snap.sections_fully_populated());
    }

    #[test]
    fn test_same_seed_generates_identical_chunks() {
        let engine = engine(1234, BiomeLayout::Flat);
        let mut a = engine.new_snapshot(0, 0);
        let mut b = engine.new_snapshot(0, 0);
        engine.apply_chunk_stages(&mut a).unwrap();
        engine.apply_chunk_stages(&mut b).unwrap();

        for sx in 0..SECTIONS_PER_AXIS {
            for sz in 0..SECTIONS_PER_AXIS {
                assert_eq!(
                    a.column_section(sx, sz).unwrap(),
                    b.column_section(sx, sz).unwrap()
                );
            }
        }
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                for y in (-64..320).step_by(7) {
                    assert_eq!(
                        a.block(x, y, z).unwrap(),
                        b.block(x, y, z).unwrap(),
                        "block ({x}, {y}, {z}) diverged"
                    );
                }
            }
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a_engine = engine(1234, BiomeLayout::Flat);
        let b_engine = engine(4321, BiomeLayout::Flat);
        let mut a = a_engine.new_snapshot(0, 0);
        let mut b = b_engine.new_snapshot(0, 0);
        a_engine.apply_chunk_stages(&mut a).unwrap();
        b_engine.apply_chunk_stages(&mut b).unwrap();

        let mut any_different = false;
        'outer: for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                for y in -64..320 {
                    if a.block(x, y, z).unwrap() != b.block(x, y, z).unwrap() {
                        any_different = true;
                        break 'outer;
                    }
                }
            }
        }
        assert!(any_different, "seeds 1234 and 4321 produced identical chunks");
    }

    #[test]
    fn test_surface_has_solid_column_below() {
        let engine = engine(1234, BiomeLayout::Flat);
        let mut snap = engine.new_snapshot(2, -3);
        engine.apply_chunk_stages(&mut snap).unwrap();

        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                // Find the surface from the top.
                let mut surface = None;
                for y in (-64..320).rev() {
                    if snap.block(x, y, z).unwrap() != BlockTypeId::AIR {
                        surface = Some(y);
                        break;
                    }
                }
                let surface = surface.unwrap_or_else(|| panic!("column ({x}, {z}) is all air"));
                // Everything below the surface is filled.
                for y in -64..surface {
                    assert_ne!(
                        snap.block(x, y, z).unwrap(),
                        BlockTypeId::AIR,
                        "hole below surface at ({x}, {y}, {z})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_volumetric_layout_populates_cells() {
        let engine = engine(99, BiomeLayout::Volumetric);
        let mut snap = engine.new_snapshot(0, 0);
        engine.apply_chunk_stages(&mut snap).unwrap();
        assert!(snap.sections_fully_populated());
        assert!(snap.cell_section(3, 0, 3).unwrap().is_some());
        assert!(snap.biome_at(0, -64, 0).unwrap().is_some());
    }

    struct FailingStage;

    impl ChunkStage for FailingStage {
        fn name(&self) -> &str {
            "failing"
        }

        fn apply(
            &self,
            _snapshot: &mut ChunkSnapshot,
            _rng: &mut ChaCha8Rng,
            _config: &GenerationConfig,
        ) -> Result<(), StageError> {
            Err(StageError::Custom("synthetic failure".into()))
        }
    }

    #[test]
    fn test_stage_error_aborts_chunk_with_context() {
        let config = two_biome_def(BiomeLayout::Flat).link(1, &blocks()).unwrap();
        let engine = Engine::new(Arc::new(config)).with_chunk_stage(Box::new(FailingStage));
        let mut snap = engine.new_snapshot(5, 6);
        let err = engine.apply_chunk_stages(&mut snap).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failing") && msg.contains("(5, 6)"), "{msg}");
        // The snapshot never reached Finished.
        assert!(!snap.is_finished());
    }

    struct RecordingStage {
        label: &'static str,
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl ChunkStage for RecordingStage {
        fn name(&self) -> &str {
            self.label
        }

        fn apply(
            &self,
            _snapshot: &mut ChunkSnapshot,
            _rng: &mut ChaCha8Rng,
            _config: &GenerationConfig,
        ) -> Result<(), StageError> {
            self.log.lock().unwrap().push(self.label);
            Ok(())
        }
    }

    #[test]
    fn test_stages_run_in_registration_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let config = two_biome_def(BiomeLayout::Flat).link(1, &blocks()).unwrap();
        let engine = Engine::new(Arc::new(config))
            .with_chunk_stage(Box::new(RecordingStage {
                label: "first",
                log: Arc::clone(&log),
            }))
            .with_chunk_stage(Box::new(RecordingStage {
                label: "second",
                log: Arc::clone(&log),
            }));
        let mut snap = engine.new_snapshot(0, 0);
        engine.apply_chunk_stages(&mut snap).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    struct LockingWorldStage;

    impl WorldStage for LockingWorldStage {
        fn name(&self) -> &str {
            "locking"
        }

        fn apply(
            &self,
            chunk_x: i32,
            chunk_z: i32,
            world: &WorldSnapshot,
            _rng: &mut ChaCha8Rng,
            _config: &GenerationConfig,
        ) -> Result<(), StageError> {
            let _guard = world.lock_scoped(chunk_x, chunk_z);
            let _neighbor = world.lock_scoped(chunk_x + 1, chunk_z);
            Ok(())
        }
    }

    #[test]
    fn test_world_stage_lock_entries_drain() {
        let config = two_biome_def(BiomeLayout::Flat).link(1, &blocks()).unwrap();
        let engine = Engine::new(Arc::new(config)).with_world_stage(Box::new(LockingWorldStage));
        let world = WorldSnapshot::new();
        engine.apply_world_stages(0, 0, &world).unwrap();
        // Guards released on drop; no lock entries may leak.
        assert_eq!(world.tracked_count(), 0);
    }
}
