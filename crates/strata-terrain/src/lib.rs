//! Procedural terrain and biome generation: seeded noise, rule-based biome
//! distribution, terrain height synthesis, and the chunk generation pipeline.

mod cache;
mod config;
mod engine;
mod interpolate;
mod pipeline;
mod scatter;
mod stages;
mod terrain;

pub mod biome;
pub mod distributor;
pub mod noise;
pub mod seed;

pub use biome::{BiomeDef, BiomeId, BiomeRegistry, BiomeRegistryError};
pub use cache::{BiomeCache, ColumnCache};
pub use config::{
    BiomeConfig, DimensionDef, DimensionSettings, GenerationConfig, GenerationDef, LinkError,
    ModifierDef, NoiseDef, RegionDef, RequirementDef, RuleDef, StackLayerDef, TerrainDef,
    TerrainLayerDef,
};
pub use distributor::{Classification, ClassifyError, Distributor};
pub use engine::{ChunkStage, Engine, EngineError, StageError, WorldStage};
pub use interpolate::final_height;
pub use noise::{NoiseAlgorithm, NoiseInstance};
pub use pipeline::{GeneratedChunk, GenerationPipeline, GenerationTask};
pub use scatter::{PointGatherer, PointScatterer, ScatterPoint, touches_chunk};
pub use stages::{ScatterFeatureStage, SurfaceStage};
pub use terrain::{
    FbmTerrain, LayeredTerrain, Terrain, TerrainLayer, TerrainNoiseLayer, TerrainStack,
};
